//! Environment overrides live in their own test binary so the variables
//! cannot leak into other settings tests running in parallel.

use hive_ingest::settings::Settings;

#[test]
fn test_environment_overrides_files() {
    std::env::set_var("HIVE_INGEST__HIVE__DATABASE", "from_env");
    std::env::set_var("HIVE_INGEST__SOURCE__MYSQL__PORT", "3307");

    let settings = Settings::load(None).unwrap();

    std::env::remove_var("HIVE_INGEST__HIVE__DATABASE");
    std::env::remove_var("HIVE_INGEST__SOURCE__MYSQL__PORT");

    assert_eq!(settings.hive.database, "from_env");
    assert_eq!(settings.source.mysql.port, 3307);
}
