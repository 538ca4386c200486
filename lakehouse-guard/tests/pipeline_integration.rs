//! End-to-end tests of the pipeline over files on disk.

use lakehouse_guard::fact::FACT_TABLE_NAME;
use lakehouse_guard::pipeline::{Pipeline, CURATED_DIR};
use lakehouse_guard::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ERP_HEADER: &str = "order_id,customer_id,store_id,date,order_value,status";
const CRM_HEADER: &str = "lead_id,name,email,source,status,store_id,date";
const PRODUCT_HEADER: &str = "product_id,name,category,price,active,store_id,date";

const ERP_SUITE: &str = r#"{"expectations": [
    {"expectation_type": "expect_table_columns_to_match_ordered_list",
     "kwargs": {"column_list": ["order_id", "customer_id", "store_id", "date", "order_value", "status"]}},
    {"expectation_type": "expect_column_values_to_not_be_null", "kwargs": {"column": "order_id"}},
    {"expectation_type": "expect_column_values_to_be_between", "kwargs": {"column": "order_value", "min_value": 0}}
]}"#;

const CRM_SUITE: &str = r#"{"expectations": [
    {"expectation_type": "expect_column_values_to_not_be_null", "kwargs": {"column": "lead_id"}},
    {"expectation_type": "expect_column_values_to_match_regex", "kwargs": {"column": "email", "regex": "^\\S+@\\S+$"}}
]}"#;

const WEB_SUITE: &str = r#"{"expectations": [
    {"expectation_type": "expect_column_values_to_not_be_null", "kwargs": {"column": "event_id"}}
]}"#;

const PRODUCT_SUITE: &str = r#"{"expectations": []}"#;

/// A complete on-disk layout in a temporary directory.
struct Layout {
    dir: TempDir,
    erp: String,
    crm: String,
    web: String,
    products: String,
    erp_suite: String,
    crm_suite: String,
}

impl Layout {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            erp: format!("{ERP_HEADER}\n1,C1,S1,2024-06-01,10.0,paid\n"),
            crm: format!("{CRM_HEADER}\n7,Ada,ada@example.com,ads,converted,S9,2024-06-05\n"),
            web: r#"{"event_id": "e1", "visitor_id": "v1", "store_id": "S9", "date": "2024-06-05T10:00:00", "page": "/", "event_type": "page_view", "metadata": {"utm": "mail"}}"#
                .to_string()
                + "\n",
            products: format!("{PRODUCT_HEADER}\nP1,Beans,coffee,9.5,true,S1,2024-06-01\n"),
            erp_suite: ERP_SUITE.to_string(),
            crm_suite: CRM_SUITE.to_string(),
        }
    }

    fn base(&self) -> &Path {
        self.dir.path()
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn write(&self) -> Pipeline {
        let samples = self.base().join("samples");
        let suites = self.base().join("expectations");
        std::fs::create_dir_all(&samples).unwrap();
        std::fs::create_dir_all(&suites).unwrap();

        std::fs::write(samples.join("erp_orders.csv"), &self.erp).unwrap();
        std::fs::write(samples.join("crm_leads.csv"), &self.crm).unwrap();
        std::fs::write(samples.join("web_events.json"), &self.web).unwrap();
        std::fs::write(samples.join("products.csv"), &self.products).unwrap();

        std::fs::write(suites.join("erp_orders.json"), &self.erp_suite).unwrap();
        std::fs::write(suites.join("crm_leads.json"), &self.crm_suite).unwrap();
        std::fs::write(suites.join("web_events.json"), WEB_SUITE).unwrap();
        std::fs::write(suites.join("products.json"), PRODUCT_SUITE).unwrap();

        Pipeline::new(PipelineConfig::from_base_dir(self.base()).unwrap())
    }
}

fn day(s: &str) -> chrono::NaiveDate {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[tokio::test]
async fn test_single_order_produces_zero_filled_fact_row() {
    let layout = Layout::new();
    let report = layout.write().run(layout.output()).await.unwrap();

    let row = report.fact.get("S1", day("2024-06-01")).unwrap();
    assert_eq!(row.revenue, 10.0);
    assert_eq!(row.order_count, 1);
    assert_eq!(row.converted_leads, 0);
    assert_eq!(row.sessions, 0);

    let fact_csv = std::fs::read_to_string(
        layout
            .output()
            .join(CURATED_DIR)
            .join(format!("{FACT_TABLE_NAME}.csv")),
    )
    .unwrap();
    let lines: Vec<&str> = fact_csv.lines().collect();
    assert_eq!(
        lines[0],
        "store_id,date,revenue,order_count,converted_leads,sessions"
    );
    assert_eq!(lines[1], "S1,2024-06-01,10.0,1,0,0");
    assert_eq!(lines[2], "S9,2024-06-05,0.0,0,1,1");
}

#[tokio::test]
async fn test_run_writes_every_table() {
    let layout = Layout::new();
    let report = layout.write().run(layout.output()).await.unwrap();

    assert_eq!(report.artifact_dir, layout.output().join(CURATED_DIR));
    let mut names: Vec<String> = report
        .artifacts
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "fct_daily_store_metrics.csv",
            "stg_crm_leads.csv",
            "stg_erp_orders.csv",
            "stg_products.csv",
            "stg_web_events.csv",
        ]
    );
    for path in &report.artifacts {
        assert!(path.is_file(), "{} missing", path.display());
    }

    let domains: Vec<Domain> = report.validations.iter().map(|v| v.domain).collect();
    assert_eq!(domains, Domain::ALL.to_vec());
    assert_eq!(report.staging_rows["stg_web_events"], 1);

    let web = std::fs::read_to_string(layout.output().join("curated/stg_web_events.csv")).unwrap();
    assert!(web.starts_with("event_id,visitor_id,store_id,date,page,event_type,metadata\n"));
    assert!(web.contains("e1,v1,S9,2024-06-05,/,page_view,"));
}

#[tokio::test]
async fn test_rerun_overwrites_artifacts() {
    let mut layout = Layout::new();
    layout.write().run(layout.output()).await.unwrap();

    layout.erp = format!("{ERP_HEADER}\n1,C1,S1,2024-06-01,25.5,paid\n");
    let report = layout.write().run(layout.output()).await.unwrap();
    assert_eq!(report.fact.get("S1", day("2024-06-01")).unwrap().revenue, 25.5);

    let fact_csv =
        std::fs::read_to_string(layout.output().join("curated/fct_daily_store_metrics.csv")).unwrap();
    assert!(fact_csv.contains("S1,2024-06-01,25.5,1,0,0"));
    assert!(!fact_csv.contains("10.0"));
}

#[tokio::test]
async fn test_web_only_key() {
    let mut layout = Layout::new();
    layout.web = [
        r#"{"event_id": "e1", "visitor_id": "v1", "store_id": "S7", "date": "2024-06-02T09:00:00", "page": "/", "event_type": "page_view", "metadata": {"utm": "ads"}}"#,
        r#"{"event_id": "e2", "visitor_id": "v2", "store_id": "S7", "date": "2024-06-02T23:59:59", "page": "/cart", "event_type": "add_to_cart", "metadata": {"utm": "ads"}}"#,
    ]
    .join("\n");
    let report = layout.write().run(layout.output()).await.unwrap();

    let row = report.fact.get("S7", day("2024-06-02")).unwrap();
    assert_eq!(
        (row.revenue, row.order_count, row.converted_leads, row.sessions),
        (0.0, 0, 0, 2)
    );
}

#[tokio::test]
async fn test_invalid_email_fails_validation() {
    let mut layout = Layout::new();
    layout.crm = format!("{CRM_HEADER}\n7,Ada,not-an-email,ads,new,S1,2024-06-01\n");
    let pipeline = layout.write();

    let err = pipeline.validate_domain(Domain::Crm).await.unwrap_err();
    match err {
        PipelineError::ExpectationFailure { rule, column, .. } => {
            assert_eq!(rule, "matches_regex");
            assert_eq!(column.as_deref(), Some("email"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // Fail-fast: nothing is written when a domain fails
    let err = pipeline.run(layout.output()).await.unwrap_err();
    assert_eq!(err.kind(), "expectation_failure");
    assert!(!layout.output().join(CURATED_DIR).exists());
}

#[tokio::test]
async fn test_timestamp_text_is_validated_as_written() {
    let mut layout = Layout::new();
    layout.erp = format!("{ERP_HEADER}\n1,C1,S1,2024-06-01 10:00:00,10.0,paid\n");
    layout.erp_suite = r#"{"expectations": [
        {"expectation_type": "expect_column_values_to_match_regex",
         "kwargs": {"column": "date", "regex": "\\d{4}-\\d{2}-\\d{2} \\d{2}:\\d{2}:\\d{2}"}},
        {"expectation_type": "expect_column_values_to_be_between",
         "kwargs": {"column": "date", "min_value": "2024-01-01"}}
    ]}"#
    .to_string();

    let report = layout.write().run(layout.output()).await.unwrap();
    assert_eq!(report.validations[0].messages.len(), 2);
    assert_eq!(report.fact.get("S1", day("2024-06-01")).unwrap().order_count, 1);
}

#[tokio::test]
async fn test_failing_rule_reported_before_malformed_rule() {
    let mut layout = Layout::new();
    layout.crm = format!("{CRM_HEADER}\n7,Ada,not-an-email,ads,new,S1,2024-06-01\n");
    layout.crm_suite = r#"{"expectations": [
        {"expectation_type": "expect_column_values_to_match_regex", "kwargs": {"column": "email", "regex": "^\\S+@\\S+$"}},
        {"expectation_type": "expect_column_values_to_match_regex", "kwargs": {"column": "email", "regex": "("}}
    ]}"#
    .to_string();

    let err = layout
        .write()
        .validate_domain(Domain::Crm)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "expectation_failure");
    assert!(err.to_string().contains("not-an-email"));
}

#[tokio::test]
async fn test_unknown_expectation_as_last_rule() {
    let mut layout = Layout::new();
    layout.erp_suite = r#"{"expectations": [
        {"expectation_type": "expect_column_values_to_not_be_null", "kwargs": {"column": "order_id"}},
        {"expectation_type": "expect_unknown_thing"}
    ]}"#
    .to_string();

    let err = layout
        .write()
        .validate_domain(Domain::Erp)
        .await
        .unwrap_err();
    assert!(
        matches!(err, PipelineError::UnsupportedRuleKind { ref kind } if kind == "expect_unknown_thing")
    );
}

#[tokio::test]
async fn test_permuted_columns_fail() {
    let mut layout = Layout::new();
    layout.erp_suite = r#"{"expectations": [
        {"expectation_type": "expect_table_columns_to_match_ordered_list",
         "kwargs": {"column_list": ["customer_id", "order_id", "store_id", "date", "order_value", "status"]}}
    ]}"#
    .to_string();

    let err = layout
        .write()
        .validate_domain(Domain::Erp)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ExpectationFailure { ref rule, .. } if rule == "columns_match_ordered"
    ));
    assert!(err.to_string().contains("Column order mismatch"));
}

#[tokio::test]
async fn test_min_value_unset_passes() {
    let mut layout = Layout::new();
    layout.erp = format!("{ERP_HEADER}\n1,C1,S1,2024-06-01,-5.0,refunded\n");
    layout.erp_suite = r#"{"expectations": [
        {"expectation_type": "expect_column_values_to_be_between",
         "kwargs": {"column": "order_value", "min_value": null, "max_value": 100}}
    ]}"#
    .to_string();

    let validation = layout
        .write()
        .validate_domain(Domain::Erp)
        .await
        .unwrap();
    assert_eq!(validation.rows, 1);
    assert_eq!(validation.messages.len(), 1);
}

#[tokio::test]
async fn test_negative_order_value_fails_min_value() {
    let mut layout = Layout::new();
    layout.erp = format!("{ERP_HEADER}\n1,C1,S1,2024-06-01,-5.0,refunded\n");

    let err = layout
        .write()
        .validate_domain(Domain::Erp)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "expectation_failure");
    assert!(err.to_string().contains("order_value"));
}

#[tokio::test]
async fn test_missing_source_file() {
    let layout = Layout::new();
    let pipeline = layout.write();
    std::fs::remove_file(layout.base().join("samples/web_events.json")).unwrap();

    let err = pipeline.validate_domain(Domain::Web).await.unwrap_err();
    assert!(matches!(err, PipelineError::SourceNotFound { ref domain, .. } if domain == "web"));
}

#[tokio::test]
async fn test_undecodable_source() {
    let mut layout = Layout::new();
    layout.web = "{\"event_id\": \"e1\", \n this is not json\n".to_string();

    let err = layout
        .write()
        .validate_domain(Domain::Web)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "source_parse_error");
}

#[tokio::test]
async fn test_config_file_with_custom_date_column() {
    let layout = Layout::new();
    layout.write();

    let raw = layout.base().join("raw");
    std::fs::create_dir_all(&raw).unwrap();
    std::fs::write(
        raw.join("orders.csv"),
        "order_id,customer_id,store_id,dt,order_value,status\n1,C1,S1,2024-06-01,10.0,paid\n",
    )
    .unwrap();
    std::fs::write(
        layout.base().join("orders_suite.json"),
        r#"{"expectations": [{"expectation_type": "expect_column_values_to_not_be_null", "kwargs": {"column": "dt"}}]}"#,
    )
    .unwrap();

    let config = serde_json::json!({
        "domains": {
            "erp": {"dataset": "erp_orders", "source": "raw/orders.csv", "expectations": "orders_suite.json", "date_column": "dt"},
            "crm": {"dataset": "crm_leads", "source": "samples/crm_leads.csv", "expectations": "expectations/crm_leads.json"},
            "web": {"dataset": "web_events", "source": "samples/web_events.json", "expectations": "expectations/web_events.json"},
            "product": {"dataset": "products", "source": "samples/products.csv", "expectations": "expectations/products.json"}
        }
    });
    let config_path = layout.base().join("pipeline.json");
    std::fs::write(&config_path, config.to_string()).unwrap();

    let pipeline = Pipeline::new(PipelineConfig::from_file(&config_path).unwrap());
    let report = pipeline.run(layout.output()).await.unwrap();
    assert_eq!(report.fact.get("S1", day("2024-06-01")).unwrap().order_count, 1);

    let orders = std::fs::read_to_string(layout.output().join("curated/stg_erp_orders.csv")).unwrap();
    assert!(orders.starts_with(ERP_HEADER));
}

#[tokio::test]
async fn test_bundled_samples() {
    let base = Path::new(env!("CARGO_MANIFEST_DIR")).join("..");
    let out = tempfile::tempdir().unwrap();

    let pipeline = Pipeline::new(PipelineConfig::from_base_dir(&base).unwrap());
    let report = pipeline.run(out.path()).await.unwrap();

    assert_eq!(report.fact.len(), 7);
    let s1 = report.fact.get("S1", day("2024-06-01")).unwrap();
    assert_eq!(s1.revenue, 200.5);
    assert_eq!((s1.order_count, s1.converted_leads, s1.sessions), (2, 1, 2));

    let s4 = report.fact.get("S4", day("2024-06-02")).unwrap();
    assert_eq!((s4.order_count, s4.converted_leads, s4.sessions), (0, 0, 0));

    let s5 = report.fact.get("S5", day("2024-06-03")).unwrap();
    assert_eq!(s5.sessions, 1);
    assert_eq!(s5.revenue, 0.0);
}
