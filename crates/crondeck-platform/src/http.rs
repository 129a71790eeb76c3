use crate::types::{
    CodeLocation, CreateFunction, FunctionConfig, FunctionRecord, PermissionGrant, RoleRecord,
    RuleRecord, RuleTarget,
};
use crate::{
    ComputeClient, IamClient, PlatformConfig, PlatformError, SchedulerClient, StorageClient,
};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// HTTP-based control-plane client.
///
/// Speaks a plain REST API, one resource family per capability:
/// - `GET/PUT/DELETE /functions/<name>` plus `/code`, `/configuration`,
///   `/invocations`, and `/permissions/<statement_id>` sub-resources
/// - `GET/PUT/DELETE /rules/<name>` plus `/targets/<id>` and `/state`
/// - `GET/PUT/DELETE /roles/<name>` plus `/policies/<name>` and `/attachments`
/// - `PUT/DELETE /objects/<bucket>/<key>`
///
/// Status mapping: 404 → `NotFound`, 409 → `Conflict`, 422 → `RoleNotReady`
/// (the control plane's "role not assumable yet" rejection), other ≥400 → `Http`.
pub struct HttpPlatform {
    config: PlatformConfig,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct PutRuleResponse {
    rule_id: String,
}

fn map_status(code: u16, url: &str) -> PlatformError {
    match code {
        404 => PlatformError::NotFound(url.to_owned()),
        409 => PlatformError::Conflict(url.to_owned()),
        422 => PlatformError::RoleNotReady(url.to_owned()),
        c => PlatformError::Http(format!("HTTP {c} for {url}")),
    }
}

impl HttpPlatform {
    pub fn new(config: PlatformConfig) -> Self {
        let agent = ureq::Agent::new_with_defaults();
        Self { config, agent }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.url)
    }

    fn send_body(
        &self,
        method: &str,
        url: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<Vec<u8>, PlatformError> {
        let mut req = match method {
            "PUT" => self.agent.put(url),
            _ => self.agent.post(url),
        }
        .header("Content-Type", content_type)
        .header("X-Crondeck-Protocol", &crate::PROTOCOL_VERSION.to_string());
        if let Some(ref token) = self.config.auth_token {
            req = req.header("Authorization", &format!("Bearer {token}"));
        }
        match req.send(data) {
            Ok(resp) => read_body(resp),
            Err(ureq::Error::StatusCode(code)) => Err(map_status(code, url)),
            Err(e) => Err(PlatformError::Http(e.to_string())),
        }
    }

    fn send_json(
        &self,
        method: &str,
        url: &str,
        body: &impl serde::Serialize,
    ) -> Result<Vec<u8>, PlatformError> {
        let data =
            serde_json::to_vec(body).map_err(|e| PlatformError::Serialization(e.to_string()))?;
        self.send_body(method, url, "application/json", &data)
    }

    fn do_get(&self, url: &str) -> Result<Vec<u8>, PlatformError> {
        let mut req = self
            .agent
            .get(url)
            .header("X-Crondeck-Protocol", &crate::PROTOCOL_VERSION.to_string());
        if let Some(ref token) = self.config.auth_token {
            req = req.header("Authorization", &format!("Bearer {token}"));
        }
        match req.call() {
            Ok(resp) => read_body(resp),
            Err(ureq::Error::StatusCode(code)) => Err(map_status(code, url)),
            Err(e) => Err(PlatformError::Http(e.to_string())),
        }
    }

    fn do_delete(&self, url: &str) -> Result<(), PlatformError> {
        let mut req = self
            .agent
            .delete(url)
            .header("X-Crondeck-Protocol", &crate::PROTOCOL_VERSION.to_string());
        if let Some(ref token) = self.config.auth_token {
            req = req.header("Authorization", &format!("Bearer {token}"));
        }
        match req.call() {
            Ok(_) => Ok(()),
            Err(ureq::Error::StatusCode(code)) => Err(map_status(code, url)),
            Err(e) => Err(PlatformError::Http(e.to_string())),
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, PlatformError> {
        let body = self.do_get(url)?;
        serde_json::from_slice(&body).map_err(|e| PlatformError::Serialization(e.to_string()))
    }
}

fn read_body(resp: ureq::http::Response<ureq::Body>) -> Result<Vec<u8>, PlatformError> {
    let mut reader = resp.into_body().into_reader();
    let mut body = Vec::new();
    reader
        .read_to_end(&mut body)
        .map_err(|e| PlatformError::Http(e.to_string()))?;
    Ok(body)
}

impl ComputeClient for HttpPlatform {
    fn get_function(&self, name: &str) -> Result<FunctionRecord, PlatformError> {
        let url = self.url(&format!("functions/{name}"));
        tracing::debug!("GET {url}");
        self.get_json(&url)
    }

    fn create_function(&self, req: &CreateFunction) -> Result<FunctionRecord, PlatformError> {
        let url = self.url(&format!("functions/{}", req.name));
        tracing::debug!("PUT {url}");
        let body = self.send_json("PUT", &url, req)?;
        serde_json::from_slice(&body).map_err(|e| PlatformError::Serialization(e.to_string()))
    }

    fn update_function_code(
        &self,
        name: &str,
        bucket: &str,
        key: &str,
    ) -> Result<(), PlatformError> {
        let url = self.url(&format!("functions/{name}/code"));
        tracing::debug!("POST {url}");
        let loc = CodeLocation {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
        };
        self.send_json("POST", &url, &loc).map(|_| ())
    }

    fn update_function_configuration(
        &self,
        name: &str,
        config: &FunctionConfig,
    ) -> Result<(), PlatformError> {
        let url = self.url(&format!("functions/{name}/configuration"));
        tracing::debug!("POST {url}");
        self.send_json("POST", &url, config).map(|_| ())
    }

    fn delete_function(&self, name: &str) -> Result<(), PlatformError> {
        let url = self.url(&format!("functions/{name}"));
        tracing::debug!("DELETE {url}");
        self.do_delete(&url)
    }

    fn list_functions(&self, prefix: &str) -> Result<Vec<FunctionRecord>, PlatformError> {
        let url = self.url(&format!("functions?prefix={prefix}"));
        tracing::debug!("GET {url}");
        self.get_json(&url)
    }

    fn invoke(&self, name: &str, payload: &[u8]) -> Result<Vec<u8>, PlatformError> {
        let url = self.url(&format!("functions/{name}/invocations"));
        tracing::debug!("POST {url} ({} bytes)", payload.len());
        self.send_body("POST", &url, "application/json", payload)
    }

    fn add_permission(&self, name: &str, grant: &PermissionGrant) -> Result<(), PlatformError> {
        let url = self.url(&format!("functions/{name}/permissions/{}", grant.statement_id));
        tracing::debug!("PUT {url}");
        self.send_json("PUT", &url, grant).map(|_| ())
    }

    fn remove_permission(&self, name: &str, statement_id: &str) -> Result<(), PlatformError> {
        let url = self.url(&format!("functions/{name}/permissions/{statement_id}"));
        tracing::debug!("DELETE {url}");
        self.do_delete(&url)
    }
}

impl SchedulerClient for HttpPlatform {
    fn put_rule(&self, name: &str, schedule: &str) -> Result<String, PlatformError> {
        let url = self.url(&format!("rules/{name}"));
        tracing::debug!("PUT {url}");
        let body = self.send_json("PUT", &url, &serde_json::json!({ "schedule": schedule }))?;
        let resp: PutRuleResponse = serde_json::from_slice(&body)
            .map_err(|e| PlatformError::Serialization(e.to_string()))?;
        Ok(resp.rule_id)
    }

    fn list_rules(&self, prefix: &str) -> Result<Vec<RuleRecord>, PlatformError> {
        let url = self.url(&format!("rules?prefix={prefix}"));
        tracing::debug!("GET {url}");
        self.get_json(&url)
    }

    fn put_target(&self, rule: &str, target: &RuleTarget) -> Result<(), PlatformError> {
        let url = self.url(&format!("rules/{rule}/targets/{}", target.id));
        tracing::debug!("PUT {url}");
        self.send_json("PUT", &url, target).map(|_| ())
    }

    fn list_targets(&self, rule: &str) -> Result<Vec<RuleTarget>, PlatformError> {
        let url = self.url(&format!("rules/{rule}/targets"));
        tracing::debug!("GET {url}");
        self.get_json(&url)
    }

    fn remove_target(&self, rule: &str, target_id: &str) -> Result<(), PlatformError> {
        let url = self.url(&format!("rules/{rule}/targets/{target_id}"));
        tracing::debug!("DELETE {url}");
        self.do_delete(&url)
    }

    fn delete_rule(&self, name: &str) -> Result<(), PlatformError> {
        let url = self.url(&format!("rules/{name}"));
        tracing::debug!("DELETE {url}");
        self.do_delete(&url)
    }

    fn set_rule_state(&self, name: &str, enabled: bool) -> Result<(), PlatformError> {
        let url = self.url(&format!("rules/{name}/state"));
        tracing::debug!("POST {url} enabled={enabled}");
        self.send_json("POST", &url, &serde_json::json!({ "enabled": enabled }))
            .map(|_| ())
    }
}

impl IamClient for HttpPlatform {
    fn get_role(&self, name: &str) -> Result<RoleRecord, PlatformError> {
        let url = self.url(&format!("roles/{name}"));
        tracing::debug!("GET {url}");
        self.get_json(&url)
    }

    fn create_role(&self, name: &str, trust_policy: &str) -> Result<RoleRecord, PlatformError> {
        let url = self.url(&format!("roles/{name}"));
        tracing::debug!("PUT {url}");
        let body = self.send_json(
            "PUT",
            &url,
            &serde_json::json!({ "trust_policy": trust_policy }),
        )?;
        serde_json::from_slice(&body).map_err(|e| PlatformError::Serialization(e.to_string()))
    }

    fn put_role_policy(&self, role: &str, policy: &str, doc: &str) -> Result<(), PlatformError> {
        let url = self.url(&format!("roles/{role}/policies/{policy}"));
        tracing::debug!("PUT {url}");
        self.send_body("PUT", &url, "application/json", doc.as_bytes())
            .map(|_| ())
    }

    fn delete_role_policy(&self, role: &str, policy: &str) -> Result<(), PlatformError> {
        let url = self.url(&format!("roles/{role}/policies/{policy}"));
        tracing::debug!("DELETE {url}");
        self.do_delete(&url)
    }

    fn attach_managed_policy(&self, role: &str, policy_id: &str) -> Result<(), PlatformError> {
        let url = self.url(&format!("roles/{role}/attachments"));
        tracing::debug!("POST {url}");
        self.send_json("POST", &url, &serde_json::json!({ "policy_id": policy_id }))
            .map(|_| ())
    }

    fn delete_role(&self, name: &str) -> Result<(), PlatformError> {
        let url = self.url(&format!("roles/{name}"));
        tracing::debug!("DELETE {url}");
        self.do_delete(&url)
    }
}

impl StorageClient for HttpPlatform {
    fn put_object(&self, bucket: &str, key: &str, local: &Path) -> Result<(), PlatformError> {
        let data = std::fs::read(local)?;
        let url = self.url(&format!("objects/{bucket}/{key}"));
        tracing::debug!("PUT {url} ({} bytes)", data.len());
        self.send_body("PUT", &url, "application/octet-stream", &data)
            .map(|_| ())
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), PlatformError> {
        let url = self.url(&format!("objects/{bucket}/{key}"));
        tracing::debug!("DELETE {url}");
        self.do_delete(&url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    struct CapturedRequest {
        method: String,
        path: String,
        headers: HashMap<String, String>,
    }

    /// Minimal control-plane stub: PUT stores (409 for duplicate role
    /// creates), GET serves stored bodies, DELETE removes or 404s, and
    /// POST to an invocations path echoes the request body. A function
    /// name containing "notready" is rejected with 422 on create.
    struct StubControlPlane {
        addr: String,
        _handle: std::thread::JoinHandle<()>,
        requests: Arc<Mutex<Vec<CapturedRequest>>>,
    }

    impl StubControlPlane {
        #[allow(clippy::too_many_lines)]
        fn start() -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = format!("http://{}", listener.local_addr().unwrap());
            let store: Arc<Mutex<HashMap<String, Vec<u8>>>> = Arc::new(Mutex::new(HashMap::new()));
            let requests: Arc<Mutex<Vec<CapturedRequest>>> = Arc::new(Mutex::new(Vec::new()));

            let store_clone = Arc::clone(&store);
            let requests_clone = Arc::clone(&requests);
            let handle = std::thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { break };
                    let store = Arc::clone(&store_clone);
                    let reqs = Arc::clone(&requests_clone);

                    std::thread::spawn(move || {
                        let mut reader = BufReader::new(stream.try_clone().unwrap());
                        let mut request_line = String::new();
                        if reader.read_line(&mut request_line).is_err() {
                            return;
                        }
                        let parts: Vec<&str> = request_line.trim().splitn(3, ' ').collect();
                        if parts.len() < 2 {
                            return;
                        }
                        let method = parts[0].to_owned();
                        let path = parts[1].to_owned();

                        let mut content_length: usize = 0;
                        let mut headers = HashMap::new();
                        loop {
                            let mut line = String::new();
                            if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
                                break;
                            }
                            if let Some((k, v)) = line.trim().split_once(": ") {
                                headers.insert(k.to_lowercase(), v.to_owned());
                            }
                            let lower = line.to_lowercase();
                            if let Some(val) = lower.strip_prefix("content-length: ") {
                                content_length = val.trim().parse().unwrap_or(0);
                            }
                        }

                        reqs.lock().unwrap().push(CapturedRequest {
                            method: method.clone(),
                            path: path.clone(),
                            headers,
                        });

                        let mut body = vec![0u8; content_length];
                        if content_length > 0 {
                            let _ = reader.read_exact(&mut body);
                        }

                        let mut data = store.lock().unwrap();
                        let (status, resp_body): (&str, Vec<u8>) = match method.as_str() {
                            "PUT" => {
                                if path.starts_with("/roles/")
                                    && !path.contains("/policies/")
                                    && data.contains_key(&path)
                                {
                                    ("409 Conflict", Vec::new())
                                } else if path.starts_with("/functions/")
                                    && path.contains("notready")
                                {
                                    ("422 Unprocessable Entity", Vec::new())
                                } else {
                                    data.insert(path.clone(), body);
                                    let resp = if let Some(name) = path.strip_prefix("/rules/") {
                                        format!("{{\"rule_id\":\"srn:scheduler:rule:{name}\"}}")
                                            .into_bytes()
                                    } else if let Some(name) = path.strip_prefix("/roles/") {
                                        format!(
                                            "{{\"name\":\"{name}\",\"role_id\":\"rrn:iam:role:{name}\",\"trust_policy\":\"\"}}"
                                        )
                                        .into_bytes()
                                    } else {
                                        Vec::new()
                                    };
                                    ("200 OK", resp)
                                }
                            }
                            "GET" => match data.get(&path) {
                                Some(val) => ("200 OK", val.clone()),
                                None => ("404 Not Found", Vec::new()),
                            },
                            "DELETE" => {
                                if data.remove(&path).is_some() {
                                    ("200 OK", Vec::new())
                                } else {
                                    ("404 Not Found", Vec::new())
                                }
                            }
                            "POST" => {
                                if path.ends_with("/invocations") {
                                    ("200 OK", body)
                                } else {
                                    ("200 OK", Vec::new())
                                }
                            }
                            _ => ("405 Method Not Allowed", Vec::new()),
                        };

                        let header = format!(
                            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                            resp_body.len()
                        );
                        let _ = stream.write_all(header.as_bytes());
                        let _ = stream.write_all(&resp_body);
                        let _ = stream.flush();
                    });
                }
            });

            StubControlPlane {
                addr,
                _handle: handle,
                requests,
            }
        }

        fn captured_requests(&self) -> Vec<CapturedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn test_client(url: &str) -> HttpPlatform {
        HttpPlatform::new(PlatformConfig::new(url))
    }

    #[test]
    fn put_rule_returns_rule_id() {
        let server = StubControlPlane::start();
        let client = test_client(&server.addr);
        let id = client.put_rule("Crondeck-nightly", "cron(0 2 * * ? *)").unwrap();
        assert_eq!(id, "srn:scheduler:rule:Crondeck-nightly");
    }

    #[test]
    fn create_role_then_duplicate_is_conflict() {
        let server = StubControlPlane::start();
        let client = test_client(&server.addr);

        let role = client.create_role("Crondeck-report-exec-role", "{}").unwrap();
        assert_eq!(role.role_id, "rrn:iam:role:Crondeck-report-exec-role");

        let dup = client.create_role("Crondeck-report-exec-role", "{}");
        assert!(matches!(dup, Err(PlatformError::Conflict(_))));
    }

    #[test]
    fn get_missing_function_is_not_found() {
        let server = StubControlPlane::start();
        let client = test_client(&server.addr);
        let result = client.get_function("Crondeck-ghost");
        assert!(matches!(result, Err(PlatformError::NotFound(_))));
    }

    #[test]
    fn create_function_role_not_ready_maps_to_422() {
        let server = StubControlPlane::start();
        let client = test_client(&server.addr);
        let req = CreateFunction {
            name: "Crondeck-notready".to_owned(),
            code: CodeLocation {
                bucket: "b".to_owned(),
                key: "k".to_owned(),
            },
            role_id: "r".to_owned(),
            config: FunctionConfig {
                timeout: 10,
                memory: 128,
                description: String::new(),
                network: None,
            },
        };
        let result = client.create_function(&req);
        assert!(matches!(result, Err(PlatformError::RoleNotReady(_))));
    }

    #[test]
    fn invoke_echoes_payload() {
        let server = StubControlPlane::start();
        let client = test_client(&server.addr);
        let body = client
            .invoke("Crondeck-report", br#"{"day":"monday"}"#)
            .unwrap();
        assert_eq!(body, br#"{"day":"monday"}"#);
    }

    #[test]
    fn delete_missing_object_is_not_found() {
        let server = StubControlPlane::start();
        let client = test_client(&server.addr);
        let result = client.delete_object("bucket", "crondeck/artifacts/ghost.tar");
        assert!(matches!(result, Err(PlatformError::NotFound(_))));
    }

    #[test]
    fn object_put_then_delete_succeeds() {
        let server = StubControlPlane::start();
        let client = test_client(&server.addr);

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("artifact.tar");
        std::fs::write(&local, b"archive bytes").unwrap();

        client
            .put_object("bucket", "crondeck/artifacts/report.tar", &local)
            .unwrap();
        client
            .delete_object("bucket", "crondeck/artifacts/report.tar")
            .unwrap();
    }

    #[test]
    fn requests_carry_protocol_and_auth_headers() {
        let server = StubControlPlane::start();
        let client = HttpPlatform::new(
            PlatformConfig::new(&server.addr).with_token("secret-token-42"),
        );

        client.put_rule("Crondeck-x", "rate(1 hour)").unwrap();
        let _ = client.get_function("Crondeck-x");

        std::thread::sleep(std::time::Duration::from_millis(50));

        let reqs = server.captured_requests();
        assert!(reqs.len() >= 2, "expected at least 2 requests");
        for req in &reqs {
            assert_eq!(
                req.headers.get("x-crondeck-protocol"),
                Some(&"1".to_owned()),
                "{} {} missing X-Crondeck-Protocol header",
                req.method,
                req.path
            );
            assert_eq!(
                req.headers.get("authorization"),
                Some(&"Bearer secret-token-42".to_owned()),
            );
        }
    }

    #[test]
    fn connection_refused_returns_http_error() {
        let client = test_client("http://127.0.0.1:1");
        let result = client.put_rule("Crondeck-x", "rate(1 hour)");
        assert!(matches!(result, Err(PlatformError::Http(_))));
    }
}
