//! Resource client tests against the mock transport

use serde_json::json;

use puppetdb_browser::models::Status;
use puppetdb_browser::services::query::{and, equals, is_null, matches};
use puppetdb_browser::services::{ApiRoot, Query, QueryBuilder};
use puppetdb_browser::PuppetDbError;

use crate::common::{MockError, MockPuppetDb, ReportFixtures};

const NEWEST_FIRST: &str = r#"[{"field":"producer_timestamp","order":"desc"}]"#;

// ==================== Nodes ====================

#[tokio::test]
async fn test_list_nodes_sends_no_filter() {
    let mock = MockPuppetDb::seeded();
    let nodes = mock.client().list_nodes().await.unwrap();

    assert_eq!(nodes.len(), 5);
    assert_eq!(nodes[0].certname, "web1.example.com");
    assert_eq!(nodes[0].latest_report_status, Some(Status::Changed));
    assert_eq!(nodes[3].latest_report_status, Some(Status::Unknown));
    assert_eq!(nodes[2].latest_report_status, None);

    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].root, ApiRoot::Query);
    assert_eq!(calls[0].path, "nodes");
    assert!(calls[0].params.pairs().is_empty());
}

#[tokio::test]
async fn test_get_node_filters_by_certname() {
    let mock = MockPuppetDb::seeded();
    let node = mock.client().get_node("db1.example.com").await.unwrap();

    assert_eq!(node.certname, "db1.example.com");
    assert_eq!(node.latest_report_status, Some(Status::Failed));
    assert!(node.is_active());
    assert_eq!(
        mock.calls()[0].params.get("query").as_deref(),
        Some(r#"["=","certname","db1.example.com"]"#)
    );
}

#[tokio::test]
async fn test_get_missing_node_is_not_found() {
    let mock = MockPuppetDb::seeded();
    let err = mock
        .client()
        .get_node("missing.example.com")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.backend_message(), "Node missing.example.com not found");
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_query_nodes_with_builder() {
    let mock = MockPuppetDb::seeded();
    let query = QueryBuilder::new()
        .equals("catalog_environment", "production")
        .equals("latest_report_status", "failed");

    let nodes = mock.client().query_nodes(&query).await.unwrap();

    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].certname, "db1.example.com");
    assert_eq!(
        mock.calls()[0].params.get("query").as_deref(),
        Some(r#"["and",["=","catalog_environment","production"],["=","latest_report_status","failed"]]"#)
    );
}

#[tokio::test]
async fn test_query_nodes_empty_builder_sends_no_query() {
    let mock = MockPuppetDb::seeded();
    let nodes = mock.client().query_nodes(&QueryBuilder::new()).await.unwrap();

    assert_eq!(nodes.len(), 5);
    assert_eq!(mock.calls()[0].params.get("query"), None);
}

#[tokio::test]
async fn test_active_nodes_query() {
    let mock = MockPuppetDb::seeded();
    let query = QueryBuilder::new()
        .is_null("deactivated", true)
        .is_null("expired", true);

    let nodes = mock.client().query_nodes(&query).await.unwrap();

    assert_eq!(nodes.len(), 4);
    assert!(nodes.iter().all(|n| n.is_active()));
}

// ==================== Reports ====================

#[tokio::test]
async fn test_list_reports_is_ordered_newest_first() {
    let mock = MockPuppetDb::seeded();
    let reports = mock.client().list_reports(10).await.unwrap();

    assert_eq!(reports.len(), 2);

    let params = &mock.calls_to("reports")[0].params;
    assert_eq!(params.get("limit").as_deref(), Some("10"));
    assert_eq!(params.get("order_by").as_deref(), Some(NEWEST_FIRST));
    assert_eq!(params.get("query"), None);
}

#[tokio::test]
async fn test_list_reports_respects_limit() {
    let mock = MockPuppetDb::new();
    mock.set_collection("reports", ReportFixtures::history("web1.example.com", 30));

    let reports = mock.client().list_reports(10).await.unwrap();

    assert_eq!(reports.len(), 10);
    assert_eq!(reports[0].hash, format!("{:040x}", 1));
}

#[tokio::test]
async fn test_list_node_reports_filters_and_orders() {
    let mock = MockPuppetDb::seeded();
    let reports = mock
        .client()
        .list_node_reports("web1.example.com", 25)
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].certname, "web1.example.com");

    let params = &mock.calls()[0].params;
    assert_eq!(
        params.get("query").as_deref(),
        Some(r#"["=","certname","web1.example.com"]"#)
    );
    assert_eq!(params.get("limit").as_deref(), Some("25"));
    assert_eq!(params.get("order_by").as_deref(), Some(NEWEST_FIRST));
}

#[tokio::test]
async fn test_get_report_decodes_nested_collections() {
    let mock = MockPuppetDb::seeded();
    let report = mock
        .client()
        .get_report("3db4c351c30135c484b128f7a408222d2ad18e77")
        .await
        .unwrap();

    assert_eq!(report.status, Some(Status::Changed));
    assert_eq!(report.duration().map(|d| d.num_milliseconds()), Some(2735));
    assert_eq!(report.log_entries().len(), 1);
    assert_eq!(report.log_entries()[0].message, "Applied catalog in 2.73 seconds");

    let resources = report.resources.as_ref().unwrap();
    assert_eq!(resources[0].resource_title, "nginx");
    assert_eq!(resources[0].events.len(), 1);
}

#[tokio::test]
async fn test_get_report_with_log_reference() {
    let mock = MockPuppetDb::seeded();
    let report = mock
        .client()
        .get_report("8c1e9a0f00b5ad3c2b6f1e4d7a9b0c3d2e1f4a5b")
        .await
        .unwrap();

    assert!(report.log_entries().is_empty());
    assert_eq!(
        report.logs.as_ref().and_then(|logs| logs.href()),
        Some("/pdb/query/v4/reports/8c1e/logs")
    );
}

#[tokio::test]
async fn test_get_missing_report_is_not_found() {
    let mock = MockPuppetDb::seeded();
    let err = mock.client().get_report("deadbeef").await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.backend_message(), "Report deadbeef not found");
}

// ==================== Facts ====================

#[tokio::test]
async fn test_get_node_facts_joins_node_and_facts() {
    let mock = MockPuppetDb::seeded();
    let facts = mock.client().get_node_facts("host-a").await.unwrap();

    assert_eq!(facts.certname, "host-a");
    assert_eq!(facts.environment.as_deref(), Some("prod"));
    assert_eq!(facts.producer, "host-a");
    assert_eq!(facts.values.len(), 2);
    assert_eq!(facts.values["os"], json!("linux"));
    assert_eq!(facts.values["cpus"], json!(4));
    assert_eq!(
        facts.timestamp.map(|t| t.to_rfc3339()),
        Some("2025-12-18T09:30:00+00:00".to_string())
    );
    assert_eq!(facts.producer_timestamp, facts.timestamp);

    let paths: Vec<String> = mock.calls().into_iter().map(|c| c.path).collect();
    assert_eq!(paths, vec!["nodes", "facts"]);
}

#[tokio::test]
async fn test_get_node_facts_for_unknown_node() {
    let mock = MockPuppetDb::seeded();
    let err = mock.client().get_node_facts("ghost").await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.backend_message(), "Facts for node ghost not found");
    assert!(mock.calls_to("facts").is_empty());
}

#[tokio::test]
async fn test_get_node_facts_for_node_without_facts() {
    let mock = MockPuppetDb::seeded();
    let facts = mock
        .client()
        .get_node_facts("db1.example.com")
        .await
        .unwrap();

    assert!(facts.values.is_empty());
    assert_eq!(facts.environment.as_deref(), Some("production"));
}

#[tokio::test]
async fn test_list_facts() {
    let mock = MockPuppetDb::seeded();
    let client = mock.client();

    let all = client.list_facts(None).await.unwrap();
    assert_eq!(all.len(), 5);

    let host_a = client.list_facts(Some("host-a")).await.unwrap();
    assert_eq!(host_a.len(), 2);
    assert!(host_a.iter().all(|f| f.certname == "host-a"));

    let calls = mock.calls();
    assert_eq!(calls[0].params.get("query"), None);
    assert_eq!(
        calls[1].params.get("query").as_deref(),
        Some(r#"["=","certname","host-a"]"#)
    );
}

#[tokio::test]
async fn test_search_facts_by_name_and_value() {
    let mock = MockPuppetDb::seeded();
    let client = mock.client();

    let facts = client.search_facts("os", Some("linux")).await.unwrap();
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].certname, "host-a");
    assert_eq!(
        mock.calls()[0].params.get("query").as_deref(),
        Some(r#"["and",["=","name","os"],["~","value","linux"]]"#)
    );

    let facts = client.search_facts("os", None).await.unwrap();
    assert_eq!(facts.len(), 2);
    assert_eq!(
        mock.calls()[1].params.get("query").as_deref(),
        Some(r#"["=","name","os"]"#)
    );
}

#[tokio::test]
async fn test_search_facts_empty_pattern_is_name_only() {
    let mock = MockPuppetDb::seeded();
    mock.client().search_facts("kernel", Some("")).await.unwrap();

    assert_eq!(
        mock.calls()[0].params.get("query").as_deref(),
        Some(r#"["=","name","kernel"]"#)
    );
}

#[tokio::test]
async fn test_name_catalogs_accept_both_shapes() {
    let mock = MockPuppetDb::seeded();
    let client = mock.client();

    assert_eq!(
        client.list_fact_names().await.unwrap(),
        vec!["cpus", "is_virtual", "kernel", "os"]
    );
    assert_eq!(
        client.list_environments().await.unwrap(),
        vec!["production", "staging", "prod"]
    );
}

// ==================== Raw queries and metrics ====================

#[tokio::test]
async fn test_execute_raw_query_sends_text_verbatim() {
    let mock = MockPuppetDb::seeded();
    let text = r#"["=", "certname", "host-a"]"#;

    let results = mock.client().execute_raw_query(text).await.unwrap();

    assert_eq!(results.as_array().map(Vec::len), Some(1));
    assert_eq!(results[0]["certname"], "host-a");

    let call = &mock.calls()[0];
    assert_eq!(call.path, "nodes");
    assert_eq!(call.params.get("query").as_deref(), Some(text));
}

#[tokio::test]
async fn test_built_queries_round_trip_through_raw_execution() {
    let cases: Vec<(Query, Vec<&str>)> = vec![
        (equals("certname", "host-a"), vec!["host-a"]),
        (matches("certname", "^web"), vec!["web1.example.com"]),
        (is_null("deactivated", false), vec!["old.staging.example.com"]),
        (
            and(vec![
                equals("catalog_environment", "production"),
                and(vec![is_null("expired", true), matches("certname", "db")]),
            ]),
            vec!["db1.example.com"],
        ),
    ];

    for (query, expected) in cases {
        let mock = MockPuppetDb::seeded();
        let text = query.to_json();

        let results = mock.client().execute_raw_query(&text).await.unwrap();

        let sent = mock.calls()[0].params.get("query").unwrap();
        assert_eq!(sent, text);
        assert_eq!(Query::parse(&sent).unwrap(), query);

        let certnames: Vec<&str> = results
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|node| node["certname"].as_str())
            .collect();
        assert_eq!(certnames, expected, "results for {}", text);
    }
}

#[tokio::test]
async fn test_execute_raw_query_surfaces_backend_rejection() {
    let mock = MockPuppetDb::seeded();
    let err = mock
        .client()
        .execute_raw_query(r#"["bogus", "certname"]"#)
        .await
        .unwrap_err();

    match err {
        PuppetDbError::Transport { status, .. } => assert_eq!(status, Some(400)),
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_metrics_uses_metrics_root() {
    let mock = MockPuppetDb::seeded();
    let metrics = mock.client().get_metrics().await.unwrap();

    assert!(metrics.contains_key("java.lang:type=Memory"));
    let call = &mock.calls()[0];
    assert_eq!(call.root, ApiRoot::Metrics);
    assert_eq!(call.path, "mbeans");
}

// ==================== Failures ====================

#[tokio::test]
async fn test_connection_failure_is_transport_error() {
    let mock = MockPuppetDb::seeded();
    mock.set_error_mode(MockError::ConnectionRefused);

    let err = mock.client().list_nodes().await.unwrap_err();

    assert!(err.is_transport_like());
    match err {
        PuppetDbError::Transport { status, .. } => assert_eq!(status, None),
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_keeps_body() {
    let mock = MockPuppetDb::seeded();
    mock.set_error_mode(MockError::InternalError("database is locked".to_string()));

    let err = mock.client().list_reports(10).await.unwrap_err();

    assert_eq!(err.backend_message(), "database is locked");
    assert_eq!(
        err.to_string(),
        "PuppetDB query failed: 500 Internal Server Error: database is locked"
    );

    mock.clear_error_mode();
    assert!(mock.client().list_reports(10).await.is_ok());
}

#[tokio::test]
async fn test_unexpected_shape_is_decode_error() {
    let mock = MockPuppetDb::seeded();
    mock.set_error_mode(MockError::Malformed);

    let err = mock.client().list_nodes().await.unwrap_err();

    assert!(matches!(err, PuppetDbError::Decode(_)));
    assert!(err.is_transport_like());
}
