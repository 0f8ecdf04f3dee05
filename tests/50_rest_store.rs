mod common;

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;

use clubes_directory::config::AppConfig;
use clubes_directory::{Directory, DocumentStore, FixedClock, RestStore, StoreError};

#[tokio::test]
async fn get_set_and_delete_over_http() -> Result<()> {
    let db = common::spawn_fake_db(None).await?;
    let store = RestStore::new(&db.base_url, None, 5)?;

    assert_eq!(store.get("grupos/chess").await?, None);

    let doc = json!({ "name": "Chess", "members": ["a@unal.edu.co"] });
    store.set("grupos/chess", &doc).await?;
    assert_eq!(store.get("grupos/chess").await?, Some(doc.clone()));
    assert_eq!(db.tree.get("grupos/chess").await?, Some(doc.clone()));

    let subtree = store.get("grupos").await?.context("collection")?;
    assert_eq!(subtree, json!({ "chess": doc }));

    let replaced = json!({ "name": "Chess Club" });
    store.update("grupos/chess", &replaced).await?;
    assert_eq!(store.get("grupos/chess").await?, Some(replaced));

    store.delete("grupos/chess").await?;
    store.delete("grupos/chess").await?;
    assert_eq!(store.get("grupos").await?, None);
    Ok(())
}

#[tokio::test]
async fn auth_token_is_sent_as_query_parameter() -> Result<()> {
    let db = common::spawn_fake_db(Some("s3cret")).await?;

    let store = RestStore::new(&db.base_url, Some("s3cret".to_string()), 5)?;
    store.set("users/x", &json!({ "email": "x@unal.edu.co" })).await?;
    assert!(store.get("users/x").await?.is_some());

    let intruder = RestStore::new(&db.base_url, Some("guess".to_string()), 5)?;
    match intruder.get("users/x").await {
        Err(StoreError::Rejected { status, path, .. }) => {
            assert_eq!(status, 401);
            assert_eq!(path, "users/x");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn unreachable_backend_is_unavailable() -> Result<()> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let store = RestStore::new(&format!("http://127.0.0.1:{}", port), None, 2)?;

    let err = store.get("grupos").await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)), "{:?}", err);
    Ok(())
}

#[tokio::test]
async fn directory_runs_against_the_rest_backend() -> Result<()> {
    let db = common::spawn_fake_db(None).await?;
    let store: Arc<dyn DocumentStore> = Arc::new(RestStore::new(&db.base_url, None, 5)?);
    let clock = Arc::new(FixedClock::at("2025-01-01 08:00:00").context("clock")?);
    let dir = Directory::new(store, clock.clone(), &AppConfig::development());

    dir.users
        .register("Ana Pérez", "ana@unal.edu.co", common::PASSWORD, "Sistemas")
        .await?;
    dir.membership
        .create_group("Robotics", "Build robots", "Tecnología", "ana@unal.edu.co")
        .await?;
    dir.events
        .create("robotics", "2025-01-01", Some("10:00"), "Demo day", "ana@unal.edu.co")
        .await?;

    let stored = db.tree.get("grupos/robotics").await?.context("group document")?;
    assert_eq!(stored["organizers"], json!(["ana@unal.edu.co"]));
    assert_eq!(stored["events"][0]["createdByName"], "Ana Pérez");

    let user = db
        .tree
        .get("users/ana_at_unal_dot_edu_dot_co")
        .await?
        .context("user document")?;
    assert_eq!(user["groupIds"], json!(["robotics"]));

    clock.advance(chrono::Duration::days(1));
    assert!(dir.events.list_for_group("robotics").await?.is_empty());
    let stored = db.tree.get("grupos/robotics").await?.context("group document")?;
    assert!(stored.get("events").is_none());
    Ok(())
}
