//! End-to-end harvest tests against a canned local OAI-PMH server.
//!
//! These exercise the two properties the incremental path depends on:
//! pagination terminates exactly when the server stops handing back a
//! resumption token, and the per-category watermark only moves after a pass
//! that finished without error.

use std::{
  sync::{Arc, Mutex},
  time::Duration,
};

use arxnews::{
  clients::OaiClient,
  database::Database,
  harvest::run_category,
};
use chrono::Utc;
use tempfile::tempdir;
use tokio::{
  io::{AsyncReadExt, AsyncWriteExt},
  net::TcpListener,
};
use tracing_test::traced_test;

/// Serves the given HTTP responses in order, one per connection, recording
/// each request line. Returns the base URL and the recorded request lines.
async fn canned_server(responses: Vec<String>) -> (String, Arc<Mutex<Vec<String>>>) {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  let requests = Arc::new(Mutex::new(Vec::new()));

  let seen = requests.clone();
  tokio::spawn(async move {
    for response in responses {
      let (mut stream, _) = listener.accept().await.unwrap();
      let mut buf = vec![0u8; 16 * 1024];
      let n = stream.read(&mut buf).await.unwrap();
      let request = String::from_utf8_lossy(&buf[..n]).to_string();
      seen.lock().unwrap().push(request.lines().next().unwrap_or_default().to_string());
      stream.write_all(response.as_bytes()).await.unwrap();
    }
  });

  (format!("http://{addr}"), requests)
}

/// Wraps an XML body in a minimal HTTP/1.1 200 response.
fn ok_response(body: &str) -> String {
  format!(
    "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: \
     close\r\n\r\n{body}",
    body.len()
  )
}

/// A one-record ListRecords page, optionally carrying a resumption token.
fn page(arxiv_id: &str, token: Option<&str>) -> String {
  let token_element = match token {
    Some(token) => format!("<resumptionToken>{token}</resumptionToken>"),
    None => "<resumptionToken cursor=\"200\"></resumptionToken>".to_string(),
  };
  ok_response(&format!(
    r#"<OAI-PMH>
         <ListRecords>
           <record>
             <header>
               <identifier>oai:arXiv.org:{arxiv_id}</identifier>
               <datestamp>2025-01-07</datestamp>
             </header>
             <metadata>
               <arXiv>
                 <created>2025-01-02</created>
                 <title>Paper {arxiv_id}</title>
                 <abstract>An abstract.</abstract>
                 <categories>cs.CV</categories>
               </arXiv>
             </metadata>
           </record>
           {token_element}
         </ListRecords>
       </OAI-PMH>"#
  ))
}

async fn test_db() -> (Database, tempfile::TempDir) {
  let dir = tempdir().unwrap();
  let db = Database::open(dir.path().join("test.db")).await.unwrap();
  (db, dir)
}

#[traced_test]
#[tokio::test]
async fn test_pagination_follows_tokens_and_terminates() {
  let (base_url, requests) = canned_server(vec![
    page("2501.00001", Some("tok-2")),
    page("2501.00002", Some("tok-3")),
    page("2501.00003", None),
  ])
  .await;

  let client = OaiClient::with_base_url(base_url).with_page_delay(Duration::ZERO);
  let since = chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
  let until = chrono::NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
  let papers = client.harvest("cs.CV", since, until).await.unwrap();

  let ids: Vec<&str> = papers.iter().map(|p| p.arxiv_id.as_str()).collect();
  assert_eq!(ids, vec!["2501.00001", "2501.00002", "2501.00003"]);

  let requests = requests.lock().unwrap();
  assert_eq!(requests.len(), 3, "empty token must end pagination");

  // The opening request carries the full range; follow-ups only the token.
  assert!(requests[0].contains("from=2025-01-01"));
  assert!(requests[0].contains("until=2025-01-07"));
  assert!(requests[1].contains("resumptionToken=tok-2"));
  assert!(!requests[1].contains("metadataPrefix"));
  assert!(requests[2].contains("resumptionToken=tok-3"));
}

#[traced_test]
#[tokio::test]
async fn test_run_category_advances_watermark_on_success() {
  let (base_url, requests) = canned_server(vec![page("2501.00001", None)]).await;
  let client = OaiClient::with_base_url(base_url).with_page_delay(Duration::ZERO);
  let (db, _dir) = test_db().await;
  db.set_checkpoint("cs.CV", "2025-01-05").await.unwrap();

  let count = run_category(&db, &client, "cs.CV", 3).await.unwrap();
  assert_eq!(count, 1);
  assert_eq!(db.count_papers().await.unwrap(), 1);

  // The pass started from the stored watermark...
  assert!(requests.lock().unwrap()[0].contains("from=2025-01-05"));
  // ...and ended it at today's date.
  let today = Utc::now().date_naive().to_string();
  assert_eq!(db.get_checkpoint("cs.CV").await.unwrap(), Some(today));
}

#[traced_test]
#[tokio::test]
async fn test_run_category_treats_empty_window_as_success() {
  let body = r#"<OAI-PMH><error code="noRecordsMatch">no records</error></OAI-PMH>"#;
  let (base_url, _requests) = canned_server(vec![ok_response(body)]).await;
  let client = OaiClient::with_base_url(base_url).with_page_delay(Duration::ZERO);
  let (db, _dir) = test_db().await;

  let count = run_category(&db, &client, "cs.CV", 3).await.unwrap();
  assert_eq!(count, 0);

  // Nothing to ingest still moves the watermark forward.
  let today = Utc::now().date_naive().to_string();
  assert_eq!(db.get_checkpoint("cs.CV").await.unwrap(), Some(today));
}

#[traced_test]
#[tokio::test]
async fn test_run_category_keeps_watermark_on_failure() {
  let failure =
    "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
      .to_string();
  let (base_url, _requests) = canned_server(vec![failure]).await;
  let client = OaiClient::with_base_url(base_url).with_page_delay(Duration::ZERO);
  let (db, _dir) = test_db().await;
  db.set_checkpoint("cs.CV", "2025-01-05").await.unwrap();

  let result = run_category(&db, &client, "cs.CV", 3).await;
  assert!(result.is_err());

  // A failed pass must not advance the watermark; the range is retried.
  assert_eq!(db.get_checkpoint("cs.CV").await.unwrap().as_deref(), Some("2025-01-05"));
  assert_eq!(db.count_papers().await.unwrap(), 0);
}
