//! Tests for the run module.

use super::*;

use hourmeter::store::MemoryStore;

fn test_options(reclaim: Option<u8>) -> RuntimeOptions {
    RuntimeOptions {
        store_path: PathBuf::from("unused.bin"),
        lock_timeout: Duration::from_millis(100),
        poll_interval: Duration::from_millis(10),
        telemetry_period: Duration::from_secs(8),
        telemetry_start_hours: 1_000.0,
        telemetry_step_hours: 1.0,
        reclaim,
    }
}

mod run_error {
    use super::*;

    #[test]
    fn settings_error_displays_source() {
        let error = RunError::from(SettingsError::NotInitialized);
        assert!(error.to_string().contains("Settings error"));
        assert!(error.to_string().contains("before initialization"));
    }

    #[test]
    fn store_error_displays_source() {
        let error = RunError::from(StoreError::Truncated {
            expected: 8,
            actual: 3,
        });
        assert!(error.to_string().contains("Failed to read settings store"));
    }

    #[test]
    fn debug_format_works() {
        let error = RunError::from(SettingsError::NotInitialized);
        let debug_str = format!("{error:?}");
        assert!(debug_str.contains("NotInitialized"));
    }
}

mod runtime_options {
    use super::*;
    use hourmeter::config::{Cli, ValidatedConfig};

    #[test]
    fn from_config_extracts_fields() {
        let cli = Cli::parse_from_iter([
            "hourmeter",
            "--store-file",
            "/tmp/settings.bin",
            "--poll-interval-ms",
            "25",
            "--telemetry-period",
            "3",
            "--reclaim",
            "9",
        ]);
        let config = ValidatedConfig::from_raw(&cli, None).unwrap();
        let options = RuntimeOptions::from(&config);

        assert_eq!(options.store_path, PathBuf::from("/tmp/settings.bin"));
        assert_eq!(options.poll_interval, Duration::from_millis(25));
        assert_eq!(options.telemetry_period, Duration::from_secs(3));
        assert_eq!(options.reclaim, Some(9));
    }

    #[test]
    fn emitter_starts_at_configured_hours() {
        let mut options = test_options(None);
        options.telemetry_start_hours = 42.0;

        let emitter = options.emitter();
        assert!((emitter.engine_hours() - 42.0).abs() < f64::EPSILON);
    }
}

mod stored_record {
    use super::*;

    #[test]
    fn never_written_store_is_invalid_and_boots_default() {
        let store = MemoryStore::new();
        let record = StoredRecord::read(&store, Path::new("mem")).unwrap();

        assert!(!record.valid);
        assert_eq!(record.boot_address, DEFAULT_DEVICE_ADDRESS);
    }

    #[test]
    fn valid_record_renders_as_text() {
        let store = MemoryStore::with_blob(PersistedConfig::new(5).to_bytes().to_vec());
        let text = StoredRecord::read(&store, Path::new("mem"))
            .unwrap()
            .render(false)
            .unwrap();

        assert!(text.contains("store: mem"));
        assert!(text.contains("0xdeedbeef (valid)"));
        assert!(text.contains("device_address: 5"));
        assert!(text.contains("boot_address: 5"));
    }

    #[test]
    fn valid_record_renders_as_json() {
        let store = MemoryStore::with_blob(PersistedConfig::new(5).to_bytes().to_vec());
        let json = StoredRecord::read(&store, Path::new("mem"))
            .unwrap()
            .render(true)
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["valid"], true);
        assert_eq!(value["signature"], 0xDEED_BEEF_u32);
        assert_eq!(value["device_address"], 5);
        assert_eq!(value["boot_address"], 5);
    }

    #[test]
    fn truncated_blob_is_an_error() {
        let store = MemoryStore::with_blob(vec![1, 2, 3]);
        let result = StoredRecord::read(&store, Path::new("mem"));

        assert!(matches!(result, Err(StoreError::Truncated { .. })));
    }
}

mod commands {
    use super::*;

    #[tokio::test]
    async fn persist_address_writes_record() {
        let store = MemoryStore::new();
        let settings = SettingsManager::new(store.clone());

        persist_address(&settings, 37).await.unwrap();

        assert_eq!(store.blob(), PersistedConfig::new(37).to_bytes().to_vec());
    }

    #[tokio::test]
    async fn persist_address_reports_write_failure() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        let settings = SettingsManager::new(store);

        let result = persist_address(&settings, 37).await;
        assert!(matches!(result, Err(RunError::Settings(_))));
    }
}

mod device {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn reclaimed_address_is_persisted() {
        let store = MemoryStore::new();
        let settings = Arc::new(SettingsManager::new(store.clone()));

        run_device(
            Arc::clone(&settings),
            &test_options(Some(40)),
            tokio::time::sleep(Duration::from_secs(1)),
        )
        .await
        .unwrap();

        assert_eq!(settings.get_device_address(), 40);
        assert_eq!(store.blob(), PersistedConfig::new(40).to_bytes().to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn boots_at_persisted_address() {
        let store = MemoryStore::with_blob(PersistedConfig::new(61).to_bytes().to_vec());
        let settings = Arc::new(SettingsManager::new(store.clone()));

        run_device(
            Arc::clone(&settings),
            &test_options(None),
            tokio::time::sleep(Duration::from_millis(100)),
        )
        .await
        .unwrap();

        assert_eq!(settings.get_device_address(), 61);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn init_failure_aborts_startup() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        let settings = Arc::new(SettingsManager::new(store));

        let result = run_device(settings, &test_options(None), std::future::pending()).await;
        assert!(matches!(result, Err(RunError::Settings(_))));
    }
}

mod watch_loop {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn failed_save_stays_pending_until_store_recovers() {
        let store = MemoryStore::new();
        let settings = Arc::new(SettingsManager::new(store.clone()));
        settings.init().await.unwrap();

        let stack = Arc::new(SimulatedStack::new(settings.get_device_address()));
        let mut address_watch = AddressWatch::new(stack, Arc::clone(&settings));

        store.set_fail_writes(true);
        run_watch_loop(
            &mut address_watch,
            Duration::from_millis(10),
            Some(50),
            tokio::time::sleep(Duration::from_millis(100)),
        )
        .await;
        assert!(address_watch.is_pending());

        store.set_fail_writes(false);
        run_watch_loop(
            &mut address_watch,
            Duration::from_millis(10),
            None,
            tokio::time::sleep(Duration::from_millis(100)),
        )
        .await;

        assert!(!address_watch.is_pending());
        assert_eq!(store.blob(), PersistedConfig::new(50).to_bytes().to_vec());
    }
}
