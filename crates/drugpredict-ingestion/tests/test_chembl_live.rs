//! Live retrieval against the public ChEMBL API.
//!
//! Run with: cargo test --package drugpredict-ingestion --test test_chembl_live -- --ignored --nocapture

use drugpredict_common::ChemblConfig;
use drugpredict_ingestion::sources::chembl::ChemblClient;
use drugpredict_ingestion::sources::ActivitySource;
use drugpredict_ingestion::{retrieve_target_data, RecordLimit};

#[tokio::test]
#[ignore] // Requires network access
async fn test_resolve_by_id_fetches_name() {
    let client = ChemblClient::new(&ChemblConfig::default()).unwrap();
    let target = client.resolve_target("chembl220").await.expect("resolve failed");
    println!("{} -> {}", target.chembl_id, target.display_name);
    assert_eq!(target.chembl_id, "CHEMBL220");
    assert!(!target.display_name.is_empty());
}

#[tokio::test]
#[ignore] // Requires network access
async fn test_fetch_limited_activities() {
    let client = ChemblClient::new(&ChemblConfig::default()).unwrap();
    let data = retrieve_target_data(&client, "acetylcholinesterase", RecordLimit::Count(25), 10)
        .await
        .expect("retrieval failed");
    println!("Target {} ({} rows)", data.target.chembl_id, data.records.len());
    assert!(data.records.len() <= 25);
    assert!(data.records.len() >= 10);
}

#[tokio::test]
#[ignore] // Requires network access
async fn test_autocomplete() {
    let client = ChemblClient::new(&ChemblConfig::default()).unwrap();
    let suggestions = client.search_targets("kinase", 10).await;
    for s in &suggestions {
        println!("{} | {} | {}", s.id, s.name, s.organism);
    }
    assert!(suggestions.len() <= 10);
}
