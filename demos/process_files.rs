//! Remittance and return processing example

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use std::str::FromStr;

use cnab_core::banks::BancoDoBrasil;
use cnab_core::utils::MemoryStorage;
use cnab_core::{
    encode, BankAdapter, BatchBuilder, BatchJob, BatchProcessor, CnabConfig, CnabFormat,
    FileType, Payer, Title,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cnab_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("🏦 CNAB Core - Remittance and Return Example\n");

    let config = CnabConfig::load()?;
    let mut processor = BatchProcessor::new(MemoryStorage::new(), config);

    // 1. Generate and submit a remittance
    println!("📤 Generating remittance for Banco do Brasil (CNAB 400)...");
    let issued = NaiveDate::from_ymd_opt(2024, 6, 3).ok_or("invalid date")?;
    let due = NaiveDate::from_ymd_opt(2024, 7, 1).ok_or("invalid date")?;
    let payer = Payer {
        document_type: 1,
        document: "12345678909".to_string(),
        name: "MARIA DA SILVA".to_string(),
        address: "RUA DAS FLORES 100".to_string(),
        district: "CENTRO".to_string(),
        zip: "20040020".to_string(),
        city: "RIO DE JANEIRO".to_string(),
        state: "RJ".to_string(),
    };
    let titles = vec![
        Title::new("1001", BigDecimal::from_str("100.00")?, due, issued).with_payer(payer.clone()),
        Title::new("1002", BigDecimal::from_str("250.50")?, due, issued).with_payer(payer),
    ];

    let remittance = processor.generate_remittance("001", CnabFormat::Cnab400, 1, titles.clone())?;
    let stored = processor
        .submit_remittance(BatchJob::remittance(
            "CBR0603.REM",
            "001",
            CnabFormat::Cnab400,
            remittance,
        ))
        .await?;
    println!("  ✓ Stored {} ({:?})", stored.id, stored.status);
    for issue in &stored.report.issues {
        println!("  ⚠ {}", issue.message);
    }
    println!();

    // 2. Simulate the bank's return: first title paid, second refused
    println!("📥 Processing return file...");
    let layout = BancoDoBrasil::new().layout(CnabFormat::Cnab400, FileType::Return)?;
    let paid_on = NaiveDate::from_ymd_opt(2024, 7, 1).ok_or("invalid date")?;
    let returned = BatchBuilder::new(&layout, 1, Utc::now().naive_utc())
        .title(titles[0].clone().settled("06", BigDecimal::from_str("100.00")?, paid_on))
        .title(titles[1].clone().rejected("03", "09"))
        .build()?;
    let summary = processor
        .process_return(
            BatchJob::return_file(
                "CBR0701.RET",
                "001",
                CnabFormat::Cnab400,
                encode(&returned, &layout)?,
            ),
            &stored.id,
        )
        .await?;

    println!(
        "  ✓ {} titles processed, {} with errors, {} received",
        summary.processed, summary.with_errors, summary.total_value
    );
    for (document_id, status) in &summary.statuses {
        println!("    {} → {}", document_id, status);
    }

    Ok(())
}
