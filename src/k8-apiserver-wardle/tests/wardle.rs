use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::json;

use fluvio_future::timer::sleep;

use k8_apiserver_config::ServerOptions;
use k8_apiserver_registry::rest;
use k8_apiserver_registry::ApiGroupInfo;
use k8_apiserver_registry::ApiRegistryBuilder;
use k8_apiserver_registry::InstallError;
use k8_apiserver_registry::RegistrationError;
use k8_apiserver_registry::RequestContext;
use k8_apiserver_registry::RestStorage;
use k8_apiserver_storage::RestOptions;
use k8_apiserver_storage::RestOptionsGetter;
use k8_apiserver_storage::StorageError;
use k8_apiserver_storage::StorageFactory;
use k8_apiserver_storage::WatchEventType;
use k8_apiserver_types::CreateOptions;
use k8_apiserver_types::DeleteOptions;
use k8_apiserver_types::GroupResource;
use k8_apiserver_types::ListOptions;
use k8_apiserver_types::UpdateOptions;
use k8_apiserver_wardle::build_registry;
use k8_apiserver_wardle::build_scheme;
use k8_apiserver_wardle::v1alpha1;
use k8_apiserver_wardle::WardleServer;
use k8_apiserver_wardle::GROUP;

fn server() -> WardleServer {
    WardleServer::new(ServerOptions::for_group(GROUP)).expect("server")
}

fn storage(server: &WardleServer, version: &str, resource: &str) -> Arc<dyn RestStorage> {
    server.resource(version, resource).expect("installed")
}

async fn create_flunder(
    storage: &Arc<dyn RestStorage>,
    ctx: &RequestContext,
    name: &str,
    reference: &str,
) -> serde_json::Value {
    storage
        .create(
            ctx,
            json!({
                "apiVersion": "wardle.example.com/v1alpha1",
                "kind": "Flunder",
                "metadata": { "name": name },
                "spec": { "reference": reference }
            }),
            &CreateOptions::default(),
        )
        .await
        .expect("create")
}

#[fluvio_future::test]
async fn test_empty_reference_rejected() {
    let server = server();
    let flunders = storage(&server, "v1alpha1", "flunders");
    let ctx = RequestContext::with_namespace("default");

    let err = flunders
        .create(
            &ctx,
            json!({ "metadata": { "name": "f1" }, "spec": { "reference": "" } }),
            &CreateOptions::default(),
        )
        .await
        .expect_err("invalid");

    assert_eq!(err.code(), 422);
    assert!(err.is_invalid());
    let errors = err.field_errors().expect("field errors");
    assert!(errors.find("spec.reference").is_some());
}

#[fluvio_future::test]
async fn test_create_and_get() {
    //given
    let server = server();
    let flunders = storage(&server, "v1alpha1", "flunders");
    let ctx = RequestContext::with_namespace("default");

    //when
    let created = create_flunder(&flunders, &ctx, "f1", "other").await;
    let fetched = flunders.get(&ctx, "f1").await.expect("get");

    //then
    assert!(!created["metadata"]["uid"].as_str().unwrap_or_default().is_empty());
    assert_eq!(fetched["metadata"]["uid"], created["metadata"]["uid"]);
    assert_eq!(fetched["metadata"]["namespace"], "default");
    assert_eq!(fetched["spec"]["referenceType"], "Flunder");
    assert_eq!(fetched["apiVersion"], "wardle.example.com/v1alpha1");

    let err = flunders
        .get(&RequestContext::with_namespace("other"), "f1")
        .await
        .expect_err("other namespace");
    assert!(err.is_not_found());
}

#[fluvio_future::test]
async fn test_stale_update_conflicts() {
    let server = server();
    let flunders = storage(&server, "v1alpha1", "flunders");
    let ctx = RequestContext::with_namespace("default");

    let created = create_flunder(&flunders, &ctx, "f1", "first").await;

    let mut first = created.clone();
    first["spec"]["reference"] = json!("second");
    let updated = flunders
        .update(&ctx, first, &UpdateOptions::default())
        .await
        .expect("update");
    assert_eq!(updated["metadata"]["generation"], 2);

    let mut stale = created;
    stale["spec"]["reference"] = json!("third");
    let err = flunders
        .update(&ctx, stale, &UpdateOptions::default())
        .await
        .expect_err("stale");
    assert!(err.is_conflict());
    assert_eq!(err.code(), 409);
}

#[fluvio_future::test]
async fn test_status_ignores_spec() {
    let server = server();
    let flunders = storage(&server, "v1alpha1", "flunders");
    let status = storage(&server, "v1alpha1", "flunders/status");
    let ctx = RequestContext::with_namespace("default");

    let created = create_flunder(&flunders, &ctx, "f1", "first").await;
    let mut changed = created;
    changed["spec"]["reference"] = json!("changed");
    let updated = status
        .update(&ctx, changed, &UpdateOptions::default())
        .await
        .expect("status update");

    assert_eq!(updated["spec"]["reference"], "first");
    assert_eq!(updated["metadata"]["generation"], 1);

    let err = status
        .list(&ctx, &ListOptions::default())
        .await
        .expect_err("list on status");
    assert_eq!(err.code(), 405);
}

#[fluvio_future::test]
async fn test_list_by_reference() {
    let server = server();
    let flunders = storage(&server, "v1alpha1", "flunders");
    let ctx = RequestContext::with_namespace("default");

    create_flunder(&flunders, &ctx, "f1", "a").await;
    create_flunder(&flunders, &ctx, "f2", "b").await;
    create_flunder(&flunders, &ctx, "f3", "a").await;

    let list = flunders
        .list(
            &ctx,
            &ListOptions {
                field_selector: Some("spec.reference=a".to_owned()),
                ..Default::default()
            },
        )
        .await
        .expect("list");

    assert_eq!(list["kind"], "FlunderList");
    let names: Vec<&str> = list["items"]
        .as_array()
        .expect("items")
        .iter()
        .filter_map(|item| item["metadata"]["name"].as_str())
        .collect();
    assert_eq!(names, vec!["f1", "f3"]);
}

#[fluvio_future::test]
async fn test_watch_until_cancel() {
    let server = server();
    let flunders = storage(&server, "v1alpha1", "flunders");
    let ctx = RequestContext::with_namespace("default");
    let watch_ctx = RequestContext::with_namespace("default");

    let mut events = flunders
        .watch(&watch_ctx, &ListOptions::default())
        .await
        .expect("watch");

    create_flunder(&flunders, &ctx, "f1", "a").await;
    let event = events.next().await.expect("event");
    assert_eq!(event.event_type, WatchEventType::Added);
    assert_eq!(event.object["metadata"]["name"], "f1");

    flunders
        .delete(&ctx, "f1", &DeleteOptions::default())
        .await
        .expect("delete");
    let event = events.next().await.expect("event");
    assert_eq!(event.event_type, WatchEventType::Deleted);

    watch_ctx.cancel();
    sleep(Duration::from_millis(5)).await;
    assert!(events.next().await.is_none());
}

#[fluvio_future::test]
async fn test_fischer_canonical_and_table() {
    let server = server();
    let fischers = storage(&server, "v1alpha1", "fischers");
    assert!(!fischers.namespace_scoped());

    let ctx = RequestContext::new();
    let created = fischers
        .create(
            &ctx,
            json!({
                "metadata": { "name": "fish" },
                "disallowedFlunders": ["b", "a", "b"]
            }),
            &CreateOptions::default(),
        )
        .await
        .expect("create");
    assert_eq!(created["disallowedFlunders"], json!(["a", "b"]));
    assert_eq!(created["kind"], "Fischer");

    let table = fischers.convert_to_table(&[created]).expect("table");
    assert_eq!(table.column_definitions.len(), 3);
    assert_eq!(table.rows[0].cells[1], json!("a,b"));

    let err = fischers
        .create(
            &ctx,
            json!({ "metadata": { "name": "blank" }, "disallowedFlunders": [""] }),
            &CreateOptions::default(),
        )
        .await
        .expect_err("blank entry");
    assert!(err.is_invalid());
}

#[fluvio_future::test]
async fn test_v1beta1_shares_storage() {
    let server = server();
    let alpha = storage(&server, "v1alpha1", "flunders");
    let beta = storage(&server, "v1beta1", "flunders");
    let ctx = RequestContext::with_namespace("default");

    create_flunder(&alpha, &ctx, "f1", "a").await;

    let fetched = beta.get(&ctx, "f1").await.expect("get through v1beta1");
    assert_eq!(fetched["apiVersion"], "wardle.example.com/v1beta1");
    assert_eq!(fetched["spec"]["reference"], "a");
    assert_eq!(fetched["spec"]["referenceType"], "Flunder");

    let list = beta
        .list(&ctx, &ListOptions::default())
        .await
        .expect("list through v1beta1");
    assert_eq!(list["items"].as_array().map(|items| items.len()), Some(1));
}

#[fluvio_future::test]
async fn test_v1beta1_update_keeps_reference_type() {
    //given
    let server = server();
    let alpha = storage(&server, "v1alpha1", "flunders");
    let beta = storage(&server, "v1beta1", "flunders");
    let ctx = RequestContext::with_namespace("default");
    alpha
        .create(
            &ctx,
            json!({
                "metadata": { "name": "f1" },
                "spec": { "reference": "fish", "referenceType": "Fischer" }
            }),
            &CreateOptions::default(),
        )
        .await
        .expect("create");

    //when
    let mut fetched = beta.get(&ctx, "f1").await.expect("get");
    fetched["spec"] = json!({ "reference": "other-fish" });
    let updated = beta
        .update(&ctx, fetched, &UpdateOptions::default())
        .await
        .expect("update through v1beta1");

    //then
    assert_eq!(updated["spec"]["referenceType"], "Fischer");
    let stored = alpha.get(&ctx, "f1").await.expect("get through v1alpha1");
    assert_eq!(stored["spec"]["reference"], "other-fish");
    assert_eq!(stored["spec"]["referenceType"], "Fischer");
}

#[fluvio_future::test]
async fn test_name_with_slash_rejected() {
    let server = server();
    let flunders = storage(&server, "v1alpha1", "flunders");
    let ctx = RequestContext::with_namespace("ns1");

    let err = flunders
        .create(
            &ctx,
            json!({ "metadata": { "name": "x/evil" }, "spec": { "reference": "a" } }),
            &CreateOptions::default(),
        )
        .await
        .expect_err("slash in name");
    assert!(err.is_invalid());

    let err = flunders
        .get(&RequestContext::with_namespace("ns1/x"), "evil")
        .await
        .expect_err("slash in namespace");
    assert_eq!(err.code(), 400);
}

#[test]
fn test_register_twice() {
    let mut builder = ApiRegistryBuilder::new();
    builder
        .register("v1alpha1", "flunders", rest::new::<v1alpha1::Flunder>())
        .expect("first");
    let err = builder
        .register("v1alpha1", "flunders", rest::new::<v1alpha1::Flunder>())
        .err()
        .expect("second");
    assert_eq!(
        err,
        RegistrationError::AlreadyRegistered {
            version: "v1alpha1".to_owned(),
            resource: "flunders".to_owned(),
        }
    );
}

/// hands out options for flunders only
struct FlundersOnly(StorageFactory);

impl RestOptionsGetter for FlundersOnly {
    fn get_rest_options(&self, resource: &GroupResource) -> Result<RestOptions, StorageError> {
        if resource.resource == "flunders" {
            self.0.get_rest_options(resource)
        } else {
            Err(StorageError::InvalidOptions(format!(
                "{} is not backed",
                resource.resource
            )))
        }
    }
}

#[test]
fn test_install_all_or_nothing() {
    let scheme = build_scheme().expect("scheme");
    let registry = build_registry().expect("registry");
    let factory = StorageFactory::new(Default::default()).expect("factory");

    let mut group = ApiGroupInfo::new(GROUP);
    let err = registry
        .install_all(&mut group, &scheme, &FlundersOnly(factory))
        .expect_err("fischers are not backed");
    assert!(matches!(
        err,
        InstallError::Provider { ref resource, .. } if resource == "fischers"
    ));
    assert!(group.is_empty());
}
