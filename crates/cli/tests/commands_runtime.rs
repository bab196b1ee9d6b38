use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use estimo_cli::commands::transition::{TransitionAction, TransitionArgs};
use estimo_cli::commands::{config, import, list, migrate, profit, report, totals, transition};
use estimo_core::config::LoadOptions;
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("ESTIMO_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run(LoadOptions::default());
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("ESTIMO_DATABASE_URL", "postgres://localhost/estimo")], || {
        let result = migrate::run(LoadOptions::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn totals_reports_subtotal_discount_and_total() {
    with_env(&[], || {
        let result = totals::run(&fixture(), LoadOptions::default());
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "totals");
        assert_eq!(payload["data"]["currency"], "BRL");
        assert_eq!(decimal(&payload["data"]["subtotal"]), Decimal::from(1400));
        assert_eq!(decimal(&payload["data"]["discount"]), Decimal::from(100));
        assert_eq!(decimal(&payload["data"]["total"]), Decimal::from(1300));
        assert_eq!(payload["data"]["item_count"], 2);
    });
}

#[test]
fn totals_rejects_unreadable_record() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ \"items\": [] }").expect("write");

        let result = totals::run(&path, LoadOptions::default());
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_input");
    });
}

#[test]
fn totals_rejects_amounts_outside_the_supported_range() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("huge.json");
        fs::write(
            &path,
            r#"{ "date": "2026-01-02", "items": [
                { "id": "big", "quantity": 1e20, "unitPrice": 1e20 }
            ] }"#,
        )
        .expect("write");

        let result = totals::run(&path, LoadOptions::default());
        assert_eq!(result.exit_code, 2, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_input");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("outside the supported range"), "message: {message}");
    });
}

#[test]
fn profit_includes_cost_and_margin() {
    with_env(&[], || {
        let result = profit::run(&fixture(), LoadOptions::default());
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(decimal(&payload["data"]["totals"]["total"]), Decimal::from(1300));
        assert_eq!(decimal(&payload["data"]["profit"]["total_cost"]), Decimal::from(570));
        assert_eq!(decimal(&payload["data"]["profit"]["net_profit"]), Decimal::from(730));
    });
}

#[test]
fn request_adjustment_without_feedback_is_rejected() {
    with_env(&[], || {
        let result = transition::run(
            args(fixture(), TransitionAction::RequestAdjustment, None),
            LoadOptions::default(),
        );
        assert_eq!(result.exit_code, 6);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "transition_rejected");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("correlation id cli-"), "message: {message}");
    });
}

#[test]
fn request_adjustment_records_feedback_and_writes_back() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("quote.json");
        fs::copy(fixture(), &path).expect("copy fixture");

        let mut request = args(path.clone(), TransitionAction::RequestAdjustment, None);
        request.feedback = Some("  Can you do 10x installments?  ".to_string());
        request.write = true;
        let result = transition::run(request, LoadOptions::default());
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["from"], "pending");
        assert_eq!(payload["data"]["to"], "negotiating");
        assert_eq!(payload["data"]["record"]["clientFeedback"], "Can you do 10x installments?");

        let resend = transition::run(
            args(path.clone(), TransitionAction::Resend, None),
            LoadOptions::default(),
        );
        let payload = parse_payload(&resend.output);
        assert_eq!(payload["data"]["to"], "pending");
        assert_eq!(payload["data"]["record"]["clientFeedback"], Value::Null);
    });
}

#[test]
fn write_back_keeps_company_custom_units_and_unknown_keys() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("quote.json");
        let mut record: Value =
            serde_json::from_str(&fs::read_to_string(fixture()).expect("read fixture"))
                .expect("fixture json");
        record["company"] = serde_json::json!({
            "razao_social": "ACME LTDA",
            "nome_fantasia": "ACME",
            "cnpj": "12.345.678/0001-90",
            "tipo_empresa": "pessoa_juridica",
            "owner_id": "u-9"
        });
        record["items"][1]["unit"] = Value::from("rolo");
        record["template"] = Value::from("modern");
        fs::write(&path, record.to_string()).expect("write record");

        let mut approve = args(path.clone(), TransitionAction::MarkApproved, None);
        approve.write = true;
        let result = transition::run(approve, LoadOptions::default());
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read back"))
                .expect("written json");
        assert_eq!(written["status"], "approved");
        assert_eq!(written["company"]["razao_social"], "ACME LTDA");
        assert_eq!(written["company"]["owner_id"], "u-9");
        assert_eq!(written["items"][1]["unit"], "rolo");
        assert_eq!(written["template"], "modern");
        assert_eq!(written["number"], record["number"]);
    });
}

#[test]
fn approved_quote_cannot_be_resent_unless_unlocked() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("quote.json");
    fs::copy(fixture(), &path).expect("copy fixture");

    with_env(&[], || {
        let mut approve = args(path.clone(), TransitionAction::Approve, None);
        approve.name = Some("Carlos".to_string());
        approve.write = true;
        let result = transition::run(approve, LoadOptions::default());
        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["record"]["clientDisplayName"], "Carlos");

        let locked = transition::run(
            args(path.clone(), TransitionAction::Resend, None),
            LoadOptions::default(),
        );
        assert_eq!(locked.exit_code, 6);
    });

    with_env(&[("ESTIMO_QUOTING_LOCK_APPROVED", "false")], || {
        let unlocked = transition::run(
            args(path.clone(), TransitionAction::Resend, None),
            LoadOptions::default(),
        );
        assert_eq!(unlocked.exit_code, 0, "{}", unlocked.output);
    });
}

#[test]
fn sign_requires_signature() {
    with_env(&[], || {
        let result =
            transition::run(args(fixture(), TransitionAction::Sign, None), LoadOptions::default());
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_input");

        let signed = transition::run(
            args(fixture(), TransitionAction::Sign, Some("data:image/png;base64,AAAA")),
            LoadOptions::default(),
        );
        let payload = parse_payload(&signed.output);
        assert_eq!(payload["data"]["to"], "approved");
        assert_eq!(payload["data"]["record"]["signature"], "data:image/png;base64,AAAA");
    });
}

#[test]
fn import_list_and_report_share_the_database() {
    let dir = TempDir::new().expect("temp dir");
    let database_url = format!("sqlite://{}?mode=rwc", dir.path().join("estimo.db").display());

    with_env(
        &[("ESTIMO_DATABASE_URL", database_url.as_str()), ("ESTIMO_QUOTING_NUMBER_PREFIX", "PRP")],
        || {
            let first = import::run(&fixture(), LoadOptions::default());
            assert_eq!(first.exit_code, 0, "{}", first.output);
            let payload = parse_payload(&first.output);
            assert_eq!(payload["data"]["id"], "O1");
            assert_eq!(payload["data"]["number"], "ORC757");
            assert_eq!(payload["data"]["version"], 1);

            let approved_path = dir.path().join("approved.json");
            let mut record: Value =
                serde_json::from_str(&fs::read_to_string(fixture()).expect("read fixture"))
                    .expect("fixture json");
            if let Some(fields) = record.as_object_mut() {
                fields.remove("number");
            }
            record["status"] = Value::from("approved");
            fs::write(&approved_path, record.to_string()).expect("write record");

            let second = import::run(&approved_path, LoadOptions::default());
            let payload = parse_payload(&second.output);
            assert_eq!(payload["data"]["id"], "O2");
            assert_eq!(payload["data"]["number"], "PRP758");

            let listed = list::run(Some("prp".to_string()), None, 1, 20, LoadOptions::default());
            let payload = parse_payload(&listed.output);
            assert_eq!(payload["data"]["total"], 1);
            assert_eq!(payload["data"]["quotes"][0]["status"], "approved");

            let report = report::run(None, None, LoadOptions::default());
            assert_eq!(report.exit_code, 0, "{}", report.output);
            let payload = parse_payload(&report.output);
            assert_eq!(payload["data"]["from"], Value::Null);
            assert_eq!(decimal(&payload["data"]["metrics"]["revenue"]), Decimal::from(1300));
            assert_eq!(decimal(&payload["data"]["metrics"]["pipeline"]), Decimal::from(1300));
            assert_eq!(payload["data"]["metrics"]["approved_count"], 1);
            assert_eq!(payload["data"]["statuses"]["pending"], 1);
        },
    );
}

#[test]
fn list_rejects_unknown_status() {
    with_env(&[("ESTIMO_DATABASE_URL", "sqlite::memory:")], || {
        let result =
            list::run(None, Some("archived".to_string()), 1, 20, LoadOptions::default());
        assert_eq!(result.exit_code, 2);
    });
}

#[test]
fn config_output_attributes_env_sources() {
    with_env(&[("ESTIMO_LOG_LEVEL", "debug")], || {
        let output = config::run(LoadOptions::default());
        assert!(output.contains("- logging.level = debug (source: env (ESTIMO_LOG_LEVEL))"));
        assert!(output.contains("- quoting.currency = BRL (source: default)"));
    });
}

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/quote_record.json")
}

fn args(file: PathBuf, action: TransitionAction, signature: Option<&str>) -> TransitionArgs {
    TransitionArgs {
        file,
        action,
        feedback: None,
        name: None,
        signature: signature.map(str::to_string),
        write: false,
    }
}

fn decimal(value: &Value) -> Decimal {
    value.as_str().and_then(|raw| raw.parse().ok()).expect("decimal rendered as string")
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "ESTIMO_DATABASE_URL",
        "ESTIMO_DATABASE_MAX_CONNECTIONS",
        "ESTIMO_DATABASE_TIMEOUT_SECS",
        "ESTIMO_LOGGING_LEVEL",
        "ESTIMO_LOGGING_FORMAT",
        "ESTIMO_LOG_LEVEL",
        "ESTIMO_LOG_FORMAT",
        "ESTIMO_QUOTING_NUMBER_PREFIX",
        "ESTIMO_QUOTING_CURRENCY",
        "ESTIMO_QUOTING_DEFAULT_NOTES",
        "ESTIMO_QUOTING_VALIDITY_DAYS",
        "ESTIMO_QUOTING_LOCK_APPROVED",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
