//! Macro-generated contract suite for `CollectionService<TestRecord>`
//!
//! `collection_service_tests!` validates any backend against the
//! accessor contract: CRUD, shallow updates, idempotent deletes, local
//! or remote query evaluation, and concurrent writers.
//!
//! # Generated Tests
//!
//! ## CRUD
//! - `test_add_assigns_id` / `test_fetch_one_missing`
//! - `test_fetch_all_in_insertion_order`
//! - `test_set_creates_and_overwrites`
//! - `test_update_merges_top_level_fields` / `test_update_missing_is_not_found`
//! - `test_update_with_mistyped_field_keeps_document`
//! - `test_remove_is_idempotent`
//!
//! ## Queries
//! - equality, numeric ranges, `array-contains`, `in`, dotted paths,
//!   mismatched types, ordering and limits
//!
//! ## Edge Cases
//! - `test_concurrent_adds`: parallel writers from spawned tasks

/// Generate the `CollectionService<TestRecord>` conformance suite.
///
/// `$factory` is re-evaluated for each test, so every test starts from an
/// empty collection. For the concurrency test the service must also be
/// `Clone + 'static`.
#[macro_export]
macro_rules! collection_service_tests {
    ($factory:expr) => {
        mod collection_service_contract_tests {
            use super::*;
            use axum::http::StatusCode;
            use serde_json::json;
            use shopdesk::core::query::{Direction, Operator, Query};
            use shopdesk::core::service::CollectionService;

            fn names(records: &[TestRecord]) -> Vec<&str> {
                records.iter().map(|r| r.name.as_str()).collect()
            }

            // ==================================================================
            // CRUD
            // ==================================================================

            #[tokio::test]
            async fn test_add_assigns_id() {
                let service = $factory;
                let created = service.add(record("Alice", 3, 9.5)).await.unwrap();
                assert!(!created.id.is_empty());
                assert_eq!(created.name, "Alice");

                let fetched = service.fetch_one(&created.id).await.unwrap().unwrap();
                assert_eq!(fetched, created);
            }

            #[tokio::test]
            async fn test_fetch_one_missing() {
                let service = $factory;
                assert!(service.fetch_one("does-not-exist").await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_fetch_all_in_insertion_order() {
                let service = $factory;
                assert!(service.fetch_all().await.unwrap().is_empty());

                for name in ["Ana", "Ben", "Cleo", "Dan"] {
                    service.add(record(name, 1, 1.0)).await.unwrap();
                }
                let all = service.fetch_all().await.unwrap();
                assert_eq!(names(&all), vec!["Ana", "Ben", "Cleo", "Dan"]);
            }

            #[tokio::test]
            async fn test_set_creates_and_overwrites() {
                let service = $factory;
                let created = service
                    .set("uid-1", in_city(record("Alice", 3, 9.5), "Lima"))
                    .await
                    .unwrap();
                assert_eq!(created.id, "uid-1");

                // Overwrite is wholesale: fields missing from the new record reset
                service.set("uid-1", record("Alicia", 0, 0.0)).await.unwrap();
                let fetched = service.fetch_one("uid-1").await.unwrap().unwrap();
                assert_eq!(fetched.name, "Alicia");
                assert_eq!(fetched.address.city, "");
                assert_eq!(service.fetch_all().await.unwrap().len(), 1);
            }

            #[tokio::test]
            async fn test_update_merges_top_level_fields() {
                let service = $factory;
                let created = service
                    .add(in_city(record("Alice", 3, 9.5), "Lima"))
                    .await
                    .unwrap();

                let updated = service
                    .update(&created.id, json!({"stock": 7, "id": "ignored"}))
                    .await
                    .unwrap();
                assert_eq!(updated.id, created.id);
                assert_eq!(updated.stock, 7);
                assert_eq!(updated.name, "Alice");
                assert_eq!(updated.address.city, "Lima");

                let fetched = service.fetch_one(&created.id).await.unwrap().unwrap();
                assert_eq!(fetched, updated);
            }

            #[tokio::test]
            async fn test_update_missing_is_not_found() {
                let service = $factory;
                let err = service
                    .update("ghost", json!({"stock": 1}))
                    .await
                    .unwrap_err();
                assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
            }

            #[tokio::test]
            async fn test_update_rejects_non_object() {
                let service = $factory;
                let created = service.add(record("Alice", 3, 9.5)).await.unwrap();
                assert!(service.update(&created.id, json!([1, 2])).await.is_err());
            }

            #[tokio::test]
            async fn test_update_with_mistyped_field_keeps_document() {
                let service = $factory;
                let created = service.add(record("Alice", 3, 9.5)).await.unwrap();
                service.add(record("Ben", 1, 1.0)).await.unwrap();

                let err = service
                    .update(&created.id, json!({"name": "Alicia", "stock": "many"}))
                    .await
                    .unwrap_err();
                assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

                let fetched = service.fetch_one(&created.id).await.unwrap().unwrap();
                assert_eq!(fetched, created);
                assert_eq!(names(&service.fetch_all().await.unwrap()), vec!["Alice", "Ben"]);
            }

            #[tokio::test]
            async fn test_remove_is_idempotent() {
                let service = $factory;
                let created = service.add(record("Alice", 3, 9.5)).await.unwrap();

                service.remove(&created.id).await.unwrap();
                assert!(service.fetch_one(&created.id).await.unwrap().is_none());
                service.remove(&created.id).await.unwrap();
                service.remove("never-existed").await.unwrap();
            }

            // ==================================================================
            // Queries
            // ==================================================================

            async fn seeded() -> impl CollectionService<TestRecord> {
                let service = $factory;
                service
                    .add(tagged(in_city(record("Oil", 2, 19.99), "Lima"), &["fluids"]))
                    .await
                    .unwrap();
                service
                    .add(tagged(in_city(record("Rims", 12, 80.0), "Quito"), &["wheels"]))
                    .await
                    .unwrap();
                service
                    .add(tagged(in_city(record("Tires", 4, 60.0), "Lima"), &["wheels", "rubber"]))
                    .await
                    .unwrap();
                service
            }

            #[tokio::test]
            async fn test_query_equality() {
                let service = seeded().await;
                let found = service
                    .query(&Query::new().where_eq("name", "Rims"))
                    .await
                    .unwrap();
                assert_eq!(names(&found), vec!["Rims"]);
            }

            #[tokio::test]
            async fn test_query_numeric_range() {
                let service = seeded().await;
                let found = service
                    .query(&Query::new().filter("stock", Operator::LessThanOrEqual, 4))
                    .await
                    .unwrap();
                assert_eq!(names(&found), vec!["Oil", "Tires"]);

                let found = service
                    .query(&Query::new().filter("price", Operator::GreaterThan, 59.5))
                    .await
                    .unwrap();
                assert_eq!(names(&found), vec!["Rims", "Tires"]);
            }

            #[tokio::test]
            async fn test_query_array_contains_and_in() {
                let service = seeded().await;
                let found = service
                    .query(&Query::new().filter("tags", Operator::ArrayContains, "wheels"))
                    .await
                    .unwrap();
                assert_eq!(names(&found), vec!["Rims", "Tires"]);

                let found = service
                    .query(&Query::new().filter("name", Operator::In, json!(["Oil", "Tires"])))
                    .await
                    .unwrap();
                assert_eq!(names(&found), vec!["Oil", "Tires"]);
            }

            #[tokio::test]
            async fn test_query_dotted_path() {
                let service = seeded().await;
                let found = service
                    .query(&Query::new().where_eq("address.city", "Lima"))
                    .await
                    .unwrap();
                assert_eq!(names(&found), vec!["Oil", "Tires"]);
            }

            #[tokio::test]
            async fn test_query_mismatched_types_never_match() {
                let service = seeded().await;
                let found = service
                    .query(&Query::new().where_eq("stock", "2"))
                    .await
                    .unwrap();
                assert!(found.is_empty());

                let found = service
                    .query(&Query::new().filter("name", Operator::GreaterThan, 1))
                    .await
                    .unwrap();
                assert!(found.is_empty());
            }

            #[tokio::test]
            async fn test_query_order_and_limit() {
                let service = seeded().await;
                let found = service
                    .query(
                        &Query::new()
                            .filter("active", Operator::Equal, true)
                            .order_by("stock", Direction::Desc)
                            .limit(2),
                    )
                    .await
                    .unwrap();
                assert_eq!(names(&found), vec!["Rims", "Tires"]);
            }

            #[tokio::test]
            async fn test_query_no_results() {
                let service = seeded().await;
                let found = service
                    .query(&Query::new().where_eq("name", "Brakes"))
                    .await
                    .unwrap();
                assert!(found.is_empty());
            }

            // ==================================================================
            // Edge Cases
            // ==================================================================

            #[tokio::test]
            async fn test_concurrent_adds() {
                let service = $factory;
                let mut handles = Vec::new();
                for i in 0..10 {
                    let service = service.clone();
                    handles.push(tokio::spawn(async move {
                        service.add(record(&format!("Item{i}"), i, 1.0)).await.unwrap()
                    }));
                }
                for handle in handles {
                    handle.await.unwrap();
                }

                let all = service.fetch_all().await.unwrap();
                assert_eq!(all.len(), 10);
                let mut ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
                ids.sort();
                ids.dedup();
                assert_eq!(ids.len(), 10);
            }
        }
    };
}
