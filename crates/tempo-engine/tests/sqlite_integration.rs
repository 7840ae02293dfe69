//! The engine over the SQLite store, including a restart from disk.

use std::sync::Arc;

use tempfile::TempDir;
use tempo_engine::{
    EngineConfig, EngineError, PhaseRequest, SessionApi, SessionEngine, UpdateSettingsRequest,
};
use tempo_session::{CacheConfig, SessionStore};
use tempo_store::SqliteSessionStore;
use tempo_types::{Phase, UserKey};

const USER: UserKey = UserKey(9);

fn open(dir: &TempDir) -> SessionApi<SqliteSessionStore> {
    let store = SqliteSessionStore::open(&dir.path().join("tempo.db")).unwrap();
    let engine = SessionEngine::new(
        Arc::new(store),
        CacheConfig::new(),
        EngineConfig::new().with_flush_every_ticks(5),
    );
    SessionApi::new(engine)
}

#[tokio::test]
async fn test_full_flow_persists_across_restart() {
    let dir = TempDir::new().unwrap();

    {
        let api = open(&dir);
        api.provision(USER).await.unwrap();
        api.update_settings(
            USER,
            UpdateSettingsRequest {
                pomodoro: Some(30),
                short_break: Some(5),
                long_break: Some(20),
                auto_transition: Some(false),
            },
        )
        .await
        .unwrap();
        api.start(USER, PhaseRequest::new(Phase::Work)).await.unwrap();
        for _ in 0..7 {
            api.engine().tick(USER).await.unwrap();
        }
        api.engine().shutdown().await;
    }

    let api = open(&dir);
    let stored = api.engine().store().load_blocking(USER).unwrap().unwrap();
    assert_eq!(stored.config.pomodoro_minutes, 30);
    assert_eq!(stored.state.remaining_seconds, 30 * 60 - 7);
    assert!(stored.state.running);

    assert_eq!(api.engine().recover_running().await.unwrap(), 1);
    api.engine().tick(USER).await.unwrap();
    let stopped = api.stop(USER).await.unwrap();
    assert_eq!(stopped.remaining_time, 30 * 60 - 8);
    assert!(api.engine().ticks().is_empty());

    let status = api.get_status(USER).await.unwrap();
    assert!(!status.is_running);
    assert_eq!(status.current_phase, Phase::Work);
}

#[tokio::test]
async fn test_deleted_row_then_purge() {
    let dir = TempDir::new().unwrap();
    let api = open(&dir);
    api.provision(USER).await.unwrap();
    api.start(USER, PhaseRequest::new(Phase::ShortBreak))
        .await
        .unwrap();

    assert!(api.engine().store().delete_blocking(USER).unwrap());
    api.purge(USER).await.unwrap();

    assert!(api.engine().ticks().is_empty());
    assert!(matches!(
        api.get_settings(USER).await,
        Err(EngineError::NotFound(_))
    ));
    assert!(api.engine().store().list_running().await.unwrap().is_empty());
}
