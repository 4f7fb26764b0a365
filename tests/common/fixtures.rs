//! Test fixtures for common test data
//!
//! Records are kept as raw PuppetDB JSON so the decode path is exercised the
//! same way it is against a live server.

use serde_json::{json, Value};

/// Node fixtures
pub struct NodeFixtures;

impl NodeFixtures {
    /// Active production web server whose last run changed resources
    pub fn web_server() -> Value {
        json!({
            "certname": "web1.example.com",
            "deactivated": null,
            "expired": null,
            "catalog_timestamp": "2025-12-18T11:49:50.100Z",
            "facts_timestamp": "2025-12-18T11:49:45.000Z",
            "report_timestamp": "2025-12-18T11:49:52.406Z",
            "catalog_environment": "production",
            "facts_environment": "production",
            "report_environment": "production",
            "latest_report_status": "changed",
            "latest_report_noop": false,
            "latest_report_noop_pending": false,
            "latest_report_hash": "3db4c351c30135c484b128f7a408222d2ad18e77",
            "latest_report_corrective_change": null,
            "cached_catalog_status": "not_used"
        })
    }

    /// Active production database server with a failed run
    pub fn db_server() -> Value {
        json!({
            "certname": "db1.example.com",
            "deactivated": null,
            "expired": null,
            "report_timestamp": "2025-12-18T11:40:00.000Z",
            "catalog_environment": "production",
            "facts_environment": "production",
            "latest_report_status": "failed",
            "latest_report_hash": "8c1e9a0f00b5ad3c2b6f1e4d7a9b0c3d2e1f4a5b"
        })
    }

    /// Deactivated staging node that never reported
    pub fn retired_node() -> Value {
        json!({
            "certname": "old.staging.example.com",
            "deactivated": "2025-11-01T08:00:00.000Z",
            "expired": null,
            "catalog_environment": "staging",
            "facts_environment": "staging",
            "latest_report_status": null
        })
    }

    /// Node whose status is a value this client does not know
    pub fn odd_status_node() -> Value {
        json!({
            "certname": "edge.example.com",
            "catalog_environment": "staging",
            "facts_environment": "staging",
            "facts_timestamp": "2025-12-18T10:00:00.000Z",
            "latest_report_status": "pending"
        })
    }

    /// The `host-a` node used by the node facts example
    pub fn host_a() -> Value {
        json!({
            "certname": "host-a",
            "facts_environment": "prod",
            "facts_timestamp": "2025-12-18T09:30:00.000Z",
            "catalog_environment": "prod",
            "latest_report_status": "unchanged"
        })
    }

    /// Full fleet, in the order PuppetDB returns it
    pub fn fleet() -> Vec<Value> {
        vec![
            Self::web_server(),
            Self::db_server(),
            Self::retired_node(),
            Self::odd_status_node(),
            Self::host_a(),
        ]
    }
}

/// Report fixtures
pub struct ReportFixtures;

impl ReportFixtures {
    /// A report with inline logs and resources
    pub fn changed_run() -> Value {
        json!({
            "hash": "3db4c351c30135c484b128f7a408222d2ad18e77",
            "certname": "web1.example.com",
            "environment": "production",
            "status": "changed",
            "noop": false,
            "noop_pending": false,
            "puppet_version": "8.24.1",
            "report_format": 12,
            "configuration_version": "1766058590",
            "start_time": "2025-12-18T11:49:49.671Z",
            "end_time": "2025-12-18T11:49:52.406Z",
            "producer_timestamp": "2025-12-18T11:49:52.406Z",
            "producer": "puppet.example.com",
            "transaction_uuid": "14958851-5cbf-483e-93a0-3b64f34296f8",
            "catalog_uuid": "68722b66-3561-4c94-bc34-31bc91bd2e5b",
            "code_id": null,
            "cached_catalog_status": "not_used",
            "resources": [{
                "resource_type": "Package",
                "resource_title": "nginx",
                "containment_path": ["Stage[main]", "Nginx", "Package[nginx]"],
                "file": "/etc/puppetlabs/code/environments/production/modules/nginx/manifests/init.pp",
                "line": 12,
                "tags": ["package", "nginx"],
                "events": [{
                    "status": "success",
                    "timestamp": "2025-12-18T11:49:51.000Z",
                    "property": "ensure",
                    "new_value": "1.24.0",
                    "old_value": "absent",
                    "message": "created"
                }]
            }],
            "logs": [{
                "level": "notice",
                "message": "Applied catalog in 2.73 seconds",
                "source": "Puppet",
                "tags": ["notice"],
                "time": "2025-12-18T11:49:52.400Z"
            }],
            "metrics": {"data": [], "href": "/pdb/query/v4/reports/3db4/metrics"}
        })
    }

    /// A failed report whose logs come back as an href reference
    pub fn failed_run() -> Value {
        json!({
            "hash": "8c1e9a0f00b5ad3c2b6f1e4d7a9b0c3d2e1f4a5b",
            "certname": "db1.example.com",
            "environment": "production",
            "status": "failed",
            "noop": false,
            "producer_timestamp": "2025-12-18T11:40:00.000Z",
            "logs": {"data": null, "href": "/pdb/query/v4/reports/8c1e/logs"}
        })
    }

    /// `count` reports for `certname`, newest first
    pub fn history(certname: &str, count: usize) -> Vec<Value> {
        (0..count)
            .map(|i| {
                json!({
                    "hash": format!("{:040x}", i + 1),
                    "certname": certname,
                    "environment": "production",
                    "status": if i % 3 == 0 { "changed" } else { "unchanged" },
                    "producer_timestamp": format!("2025-12-18T{:02}:00:00.000Z", 23 - (i % 24)),
                })
            })
            .collect()
    }
}

/// Fact fixtures
pub struct FactFixtures;

impl FactFixtures {
    fn fact(certname: &str, name: &str, value: Value, environment: &str) -> Value {
        json!({
            "certname": certname,
            "name": name,
            "value": value,
            "environment": environment
        })
    }

    /// Facts of `host-a`
    pub fn host_a() -> Vec<Value> {
        vec![
            Self::fact("host-a", "os", json!("linux"), "prod"),
            Self::fact("host-a", "cpus", json!(4), "prod"),
        ]
    }

    /// Facts of `web1.example.com`
    pub fn web_server() -> Vec<Value> {
        vec![
            Self::fact("web1.example.com", "kernel", json!("Linux"), "production"),
            Self::fact(
                "web1.example.com",
                "os",
                json!({"family": "Debian", "release": {"major": "12", "full": "12.8"}}),
                "production",
            ),
            Self::fact("web1.example.com", "is_virtual", json!(true), "production"),
        ]
    }

    /// Facts of every fixture node
    pub fn all() -> Vec<Value> {
        let mut facts = Self::web_server();
        facts.extend(Self::host_a());
        facts
    }

    /// `/fact-names` response; PuppetDB returns bare strings here
    pub fn names() -> Value {
        json!(["cpus", "is_virtual", "kernel", "os"])
    }
}

/// `/environments` response; each entry is a `{name}` object
pub fn environments() -> Value {
    json!([{"name": "production"}, {"name": "staging"}, {"name": "prod"}])
}

/// Abbreviated `/metrics/v1/mbeans` listing
pub fn mbeans() -> Value {
    json!({
        "java.lang:type=Memory": "/metrics/v1/mbeans/java.lang%3Atype%3DMemory",
        "puppetlabs.puppetdb.population:name=num-nodes":
            "/metrics/v1/mbeans/puppetlabs.puppetdb.population%3Aname%3Dnum-nodes"
    })
}
