use anyhow::Result;
use std::time::Duration;

const TRAEFIK_API_URL: &str = "http://localhost:8080";

/// Query the Traefik API and return the hosts its HTTP routers match.
/// Returns empty vec if the API is unreachable (graceful degradation).
pub async fn get_active_hosts() -> Result<Vec<String>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let resp = match client
        .get(format!("{}/api/http/routers", TRAEFIK_API_URL))
        .send()
        .await
    {
        Ok(r) => r,
        Err(_) => return Ok(vec![]),
    };

    let body: serde_json::Value = match resp.json().await {
        Ok(v) => v,
        Err(_) => return Ok(vec![]),
    };

    let mut hosts = Vec::new();
    extract_hosts(&body, &mut hosts);
    hosts.sort();
    hosts.dedup();
    Ok(hosts)
}

/// Check if the Traefik API answers on localhost:8080.
pub async fn is_reachable() -> bool {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
    {
        Ok(c) => c,
        Err(_) => return false,
    };

    client
        .get(format!("{}/api/version", TRAEFIK_API_URL))
        .send()
        .await
        .is_ok_and(|r| r.status().is_success())
}

/// Collect `Host(`...`)` arguments from every router `rule` in the response.
fn extract_hosts(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(rule)) = map.get("rule") {
                out.extend(hosts_in_rule(rule));
            }
            for v in map.values() {
                if v.is_object() || v.is_array() {
                    extract_hosts(v, out);
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for v in arr {
                extract_hosts(v, out);
            }
        }
        _ => {}
    }
}

/// `Host(`a`) || Host(`b`, `c`)` → a, b, c
fn hosts_in_rule(rule: &str) -> Vec<String> {
    let mut hosts = Vec::new();
    let mut rest = rule;
    while let Some(start) = rest.find("Host(") {
        let after = &rest[start + "Host(".len()..];
        let Some(end) = after.find(')') else { break };
        hosts.extend(
            after[..end]
                .split(',')
                .map(|h| h.trim().trim_matches('`').to_string())
                .filter(|h| !h.is_empty()),
        );
        rest = &after[end..];
    }
    hosts
}
