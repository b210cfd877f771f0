//! Shared fixtures: sample documents, workspaces and a canned HTTP endpoint.

use async_trait::async_trait;
use orgtree::error::TransportError;
use orgtree::remote::{FetchRequest, RemoteTreeFetcher};
use parking_lot::Mutex;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread;

/// City org chart: root, a board of type X with a member, and a department with two units.
pub const CHART: &str = r#"[
  {
    "ID": "1", "Name": "City", "Type": "Organization", "TypeId": "O",
    "OrganizationLevelBelow": [
      {
        "ID": "2", "Name": "Board", "Type": "Board", "TypeId": "X",
        "OrganizationLevelBelow": [
          {"ID": "21", "Name": "Board member office", "Type": "Office", "TypeId": "U"}
        ]
      },
      {
        "ID": 3, "Name": "Education", "Type": "Department", "TypeId": 12,
        "OrganizationLevelBelow": [
          {"ID": "31", "Name": "Schools", "Type": "Unit", "TypeId": "U"},
          {"ID": "32", "Name": "Libraries", "Type": "Unit", "TypeId": "U", "OrganizationLevelBelow": null}
        ]
      }
    ]
  }
]"#;

/// Same chart after a reorganization: Libraries moved under Board, Schools renamed.
pub const CHART_REORGANIZED: &str = r#"[
  {
    "ID": "1", "Name": "City", "Type": "Organization", "TypeId": "O",
    "OrganizationLevelBelow": [
      {
        "ID": "2", "Name": "Board", "Type": "Board", "TypeId": "X",
        "OrganizationLevelBelow": [
          {"ID": "21", "Name": "Board member office", "Type": "Office", "TypeId": "U"},
          {"ID": "32", "Name": "Libraries", "Type": "Unit", "TypeId": "U"}
        ]
      },
      {
        "ID": 3, "Name": "Education", "Type": "Department", "TypeId": 12,
        "OrganizationLevelBelow": [
          {"ID": "31", "Name": "Schools and Daycare", "Type": "Unit", "TypeId": "U"}
        ]
      }
    ]
  }
]"#;

pub const CHART_NODES: usize = 6;

/// Fetcher returning queued bodies in order, then the last one forever.
pub struct ScriptedFetcher {
    bodies: Mutex<Vec<String>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new(bodies: &[&str]) -> Self {
        Self {
            bodies: Mutex::new(bodies.iter().rev().map(|b| b.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl RemoteTreeFetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, TransportError> {
        self.requests.lock().push(request.to_string());
        let mut bodies = self.bodies.lock();
        match bodies.len() {
            0 => Err(TransportError::Network("no scripted response".to_string())),
            1 => Ok(bodies[0].clone()),
            _ => Ok(bodies.pop().unwrap_or_default()),
        }
    }
}

/// Create a workspace whose store lives inside it.
pub fn workspace(root: &Path, extra_config: &str) -> PathBuf {
    let workspace = root.join("workspace");
    fs::create_dir_all(&workspace).unwrap();
    fs::write(
        workspace.join("orgtree.toml"),
        format!("[storage]\nstore_path = \"store\"\n\n{}", extra_config),
    )
    .unwrap();
    workspace
}

/// Serve `count` canned JSON responses on a local port, returning the base URL.
pub fn serve_json(body: &'static str, count: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for _ in 0..count {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{}", addr)
}
