//! End-to-end index lifecycle tests: migration, bulk loading and failure
//! handling against a mock engine

mod common;

use common::{bulk_ok, group_for, population_config, scroll_page};
use mockito::Matcher;
use search_broker::index::{load_stream, reindex, IndexError};

const OLD_INDEX: &str = "mainstream-2026-01-01t00-00-00z-0afce383-d595-4b2d-a6b4-857463b13d1c";

/// The create path is a bare concrete index name; settings, bulk and
/// refresh paths all carry a suffix, so the anchor keeps them apart
const NEW_INDEX_PATTERN: &str = r"^/mainstream-\d{4}-\d{2}-\d{2}t\d{2}-\d{2}-\d{2}z-[0-9a-f-]+$";

fn alias_map() -> String {
    format!(r#"{{"{}":{{"aliases":{{"mainstream":{{}}}}}}}}"#, OLD_INDEX)
}

#[tokio::test]
async fn test_migration_copies_documents_and_switches_alias() {
    let mut server = mockito::Server::new_async().await;

    let create = server
        .mock("PUT", Matcher::Regex(NEW_INDEX_PATTERN.to_string()))
        .match_body(Matcher::Regex("mappings".to_string()))
        .with_body(r#"{"acknowledged":true}"#)
        .create_async()
        .await;
    let _current = server
        .mock("GET", "/mainstream/_aliases")
        .with_body(alias_map())
        .create_async()
        .await;

    // The live index is locked for the copy and released afterwards
    let lock = server
        .mock("PUT", format!("/{}/_settings", OLD_INDEX).as_str())
        .match_body(Matcher::JsonString(
            r#"{"index":{"blocks":{"read_only_allow_delete":true}}}"#.to_string(),
        ))
        .with_body("{}")
        .create_async()
        .await;
    let unlock = server
        .mock("PUT", format!("/{}/_settings", OLD_INDEX).as_str())
        .match_body(Matcher::JsonString(
            r#"{"index":{"blocks":{"read_only_allow_delete":false}}}"#.to_string(),
        ))
        .with_body("{}")
        .create_async()
        .await;

    let _scan = server
        .mock("GET", format!("/{}/_search", OLD_INDEX).as_str())
        .match_query(Matcher::Any)
        .with_body(scroll_page("t1", &["/vat-rates", "/bank-holidays"], 2))
        .create_async()
        .await;
    let _scan_end = server
        .mock("POST", "/_search/scroll")
        .with_body(scroll_page("t2", &[], 2))
        .create_async()
        .await;

    let bulk = server
        .mock("POST", Matcher::Regex(r"^/mainstream-.+/_bulk$".to_string()))
        .match_body(Matcher::Regex(r#""_id":"/vat-rates""#.to_string()))
        .with_body(bulk_ok(&["/vat-rates", "/bank-holidays"]))
        .create_async()
        .await;
    let refresh = server
        .mock("POST", Matcher::Regex(r"^/mainstream-.+/_refresh$".to_string()))
        .with_body("{}")
        .create_async()
        .await;

    let _aliases = server
        .mock("GET", "/_aliases")
        .with_body(alias_map())
        .create_async()
        .await;
    let swap = server
        .mock("POST", "/_aliases")
        .match_body(Matcher::Regex(format!(
            r#""remove":\{{"index":"{}","alias":"mainstream"\}}"#,
            OLD_INDEX
        )))
        .with_body(r#"{"acknowledged":true}"#)
        .create_async()
        .await;
    let close = server
        .mock("POST", format!("/{}/_close", OLD_INDEX).as_str())
        .with_body("{}")
        .create_async()
        .await;

    let group = group_for(&server.url(), "mainstream");
    let applied = reindex(&group, &population_config()).await.unwrap();

    assert_eq!(applied, 2);
    create.assert_async().await;
    lock.assert_async().await;
    bulk.assert_async().await;
    refresh.assert_async().await;
    swap.assert_async().await;
    close.assert_async().await;
    unlock.assert_async().await;
}

#[tokio::test]
async fn test_migration_with_no_live_index_switches_an_empty_index() {
    let mut server = mockito::Server::new_async().await;

    let _create = server
        .mock("PUT", Matcher::Regex(NEW_INDEX_PATTERN.to_string()))
        .with_body(r#"{"acknowledged":true}"#)
        .create_async()
        .await;
    let _current = server
        .mock("GET", "/mainstream/_aliases")
        .with_status(404)
        .create_async()
        .await;

    let bulk = server
        .mock("POST", Matcher::Regex(r"^/mainstream-.+/_bulk$".to_string()))
        .expect(0)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", Matcher::Regex(r"^/mainstream-.+/_refresh$".to_string()))
        .with_body("{}")
        .create_async()
        .await;

    let _aliases = server
        .mock("GET", "/_aliases")
        .with_body("{}")
        .create_async()
        .await;
    let swap = server
        .mock("POST", "/_aliases")
        .match_body(Matcher::Regex(r#""add":\{"index":"mainstream-"#.to_string()))
        .with_body(r#"{"acknowledged":true}"#)
        .create_async()
        .await;

    let group = group_for(&server.url(), "mainstream");
    let applied = reindex(&group, &population_config()).await.unwrap();

    assert_eq!(applied, 0);
    bulk.assert_async().await;
    refresh.assert_async().await;
    swap.assert_async().await;
}

#[tokio::test]
async fn test_load_stream_applies_action_source_pairs() {
    let mut server = mockito::Server::new_async().await;

    let _create = server
        .mock("PUT", Matcher::Regex(NEW_INDEX_PATTERN.to_string()))
        .with_body(r#"{"acknowledged":true}"#)
        .create_async()
        .await;
    let _current = server
        .mock("GET", "/mainstream/_aliases")
        .with_status(404)
        .create_async()
        .await;

    // The stream is passed through untouched, pairs kept together
    let bulk = server
        .mock("POST", Matcher::Regex(r"^/mainstream-.+/_bulk$".to_string()))
        .match_body(Matcher::Regex(
            "^\\{\"index\":\\{\"_id\":\"/vat-rates\"\\}\\}\n\\{\"link\":\"/vat-rates\"\\}\n\\{\"index\":\\{\"_id\":\"/bank-holidays\"\\}\\}\n\\{\"link\":\"/bank-holidays\"\\}\n$"
                .to_string(),
        ))
        .with_body(bulk_ok(&["/vat-rates", "/bank-holidays"]))
        .create_async()
        .await;
    let _refresh = server
        .mock("POST", Matcher::Regex(r"^/mainstream-.+/_refresh$".to_string()))
        .with_body("{}")
        .create_async()
        .await;
    let _aliases = server
        .mock("GET", "/_aliases")
        .with_body("{}")
        .create_async()
        .await;
    let _swap = server
        .mock("POST", "/_aliases")
        .with_body(r#"{"acknowledged":true}"#)
        .create_async()
        .await;

    let data: &[u8] = b"{\"index\":{\"_id\":\"/vat-rates\"}}\n{\"link\":\"/vat-rates\"}\n{\"index\":{\"_id\":\"/bank-holidays\"}}\n{\"link\":\"/bank-holidays\"}\n";
    let group = group_for(&server.url(), "mainstream");
    let applied = load_stream(&group, data, &population_config()).await.unwrap();

    assert_eq!(applied, 2);
    bulk.assert_async().await;
}

#[tokio::test]
async fn test_failed_population_leaves_the_alias_alone() {
    let mut server = mockito::Server::new_async().await;

    let _create = server
        .mock("PUT", Matcher::Regex(NEW_INDEX_PATTERN.to_string()))
        .with_body(r#"{"acknowledged":true}"#)
        .create_async()
        .await;
    let _current = server
        .mock("GET", "/mainstream/_aliases")
        .with_body(alias_map())
        .create_async()
        .await;
    // Lock on the way in, unlock on the way out despite the failure
    let settings = server
        .mock("PUT", format!("/{}/_settings", OLD_INDEX).as_str())
        .with_body("{}")
        .expect(2)
        .create_async()
        .await;

    let _scan = server
        .mock("GET", format!("/{}/_search", OLD_INDEX).as_str())
        .match_query(Matcher::Any)
        .with_body(scroll_page("t1", &["/vat-rates"], 1))
        .create_async()
        .await;
    let _scan_end = server
        .mock("POST", "/_search/scroll")
        .with_body(scroll_page("t2", &[], 1))
        .create_async()
        .await;

    let _bulk = server
        .mock("POST", Matcher::Regex(r"^/mainstream-.+/_bulk$".to_string()))
        .with_body(
            r#"{"items":[{"index":{"_id":"/vat-rates","status":403,"error":"ClusterBlockException[blocked by: [FORBIDDEN/8/index read-only / allow delete (api)];]"}}]}"#,
        )
        .create_async()
        .await;

    let refresh = server
        .mock("POST", Matcher::Regex(r"^/mainstream-.+/_refresh$".to_string()))
        .expect(0)
        .create_async()
        .await;
    let swap = server
        .mock("POST", "/_aliases")
        .expect(0)
        .create_async()
        .await;
    let close = server
        .mock("POST", format!("/{}/_close", OLD_INDEX).as_str())
        .expect(0)
        .create_async()
        .await;

    let group = group_for(&server.url(), "mainstream");
    let err = reindex(&group, &population_config()).await.unwrap_err();

    assert!(matches!(err, IndexError::Locked { .. }));
    settings.assert_async().await;
    refresh.assert_async().await;
    swap.assert_async().await;
    close.assert_async().await;
}
