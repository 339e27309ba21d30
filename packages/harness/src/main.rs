//! The hangar binary: serves the demonstration platform configuration.
//!
//! Five services mirror a small booking platform in one process: two JSON
//! record APIs with durable state, queue producers, and queue consumers
//! that project events into bucket dashboards; two page services; and the
//! generic bucket proxy for ad-hoc inspection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use hangar_harness::{
    BucketProxy, ConfigError, ConsumerPolicy, Edge, Env, HandlerError, Harness, Method,
    MessageBatch, Request, Response, RoutePath, ServiceDescriptor, ServiceHandler,
};

/// A JSON API over one durable repository.
///
/// Writes land in the service's durable object and produce one event; the
/// consumer side folds delivered events into a projection object in the
/// service's bucket, where the bucket proxy can inspect it.
struct RecordApi {
    objects_binding: &'static str,
    producer_binding: &'static str,
    bucket_binding: &'static str,
    projection_key: &'static str,
}

impl RecordApi {
    fn collection(request: &Request) -> String {
        RoutePath::parse(&request.path)
            .ok()
            .and_then(|path| path.segments.first().cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ServiceHandler for RecordApi {
    async fn fetch(&self, request: Request, env: &Env) -> Result<Response, HandlerError> {
        let api_key = env.var("api_key")?;
        if request.headers.get("x-api-key").map(String::as_str) != Some(api_key) {
            return Ok(Response::error(401, "unauthorized"));
        }
        let collection = Self::collection(&request);
        let repository = env.objects(self.objects_binding)?.get("default");
        match request.method {
            Method::GET => {
                let storage = repository.storage().await;
                let prefix = format!("{collection}:");
                let records: Vec<Value> = storage
                    .keys()
                    .iter()
                    .filter(|key| key.starts_with(&prefix))
                    .filter_map(|key| storage.get(key).cloned())
                    .collect();
                Ok(Response::json(200, json!({ "items": records })))
            }
            Method::POST => {
                let body = request.body.clone().unwrap_or(Value::Null);
                let key = {
                    let mut storage = repository.storage().await;
                    let key = format!("{collection}:{}", storage.len());
                    storage.put(&key, body);
                    key
                };
                env.queue(self.producer_binding)?
                    .produce(json!({ "resource": collection, "key": key }))?;
                Ok(Response::json(201, json!({ "stored": key })))
            }
            _ => Ok(Response::error(405, "method not allowed")),
        }
    }

    async fn queue(&self, batch: MessageBatch, env: &Env) -> Result<(), HandlerError> {
        let bucket = env.bucket(self.bucket_binding)?;
        let mut projection = bucket
            .get(self.projection_key)
            .unwrap_or_else(|| json!({}));
        if let Value::Object(map) = &mut projection {
            for message in &batch.messages {
                if let Some(resource) = message.body.get("resource").and_then(Value::as_str) {
                    let count = map.get(resource).and_then(Value::as_i64).unwrap_or(0);
                    map.insert(resource.to_string(), json!(count + 1));
                }
            }
        }
        bucket.put(self.projection_key, projection);
        Ok(())
    }
}

/// A static page service.
struct SitePage {
    title: &'static str,
}

#[async_trait]
impl ServiceHandler for SitePage {
    async fn fetch(&self, _request: Request, _env: &Env) -> Result<Response, HandlerError> {
        Ok(Response::text(
            200,
            "text/html; charset=utf-8",
            format!(
                "<!doctype html><html><head><title>{0}</title></head>\
                 <body><h1>{0}</h1></body></html>",
                self.title
            ),
        ))
    }
}

fn demo_platform() -> Result<Harness, ConfigError> {
    let policy = |dlq: &str| {
        ConsumerPolicy::new(5, Duration::from_secs(1))
            .with_max_retries(1)
            .with_dead_letter_queue(dlq)
    };

    let mut builder = Harness::builder();
    builder
        .register(
            ServiceDescriptor::new("scheduling_api")
                .with_route("/flights")
                .with_route("/airships")
                .with_route("/airfields")
                .with_var("api_key", "1234")
                .with_queue_producer("reservation_queue", "reservation_events")
                .with_queue_producer("scheduling_queue", "scheduling_events")
                .with_durable_objects("scheduling_objects", "SchedulingRepository")
                .with_bucket("scheduling", "scheduling_bucket")
                .with_queue_consumer("scheduling_events", policy("scheduling_events-dlq")),
            Arc::new(RecordApi {
                objects_binding: "scheduling_objects",
                producer_binding: "scheduling_queue",
                bucket_binding: "scheduling",
                projection_key: "dashboard",
            }),
        )?
        .register(
            ServiceDescriptor::new("backoffice_site")
                .with_route("/flight-scheduling")
                .with_route("/js/*")
                .with_route("/img/*")
                .with_route("/css/*"),
            Arc::new(SitePage {
                title: "Backoffice",
            }),
        )?
        .register(
            ServiceDescriptor::new("reservation_site")
                .with_route("/journey-around-the-north-atlantic")
                .with_route("/journey-around-the-north-atlantic/*"),
            Arc::new(SitePage {
                title: "Journey around the North Atlantic",
            }),
        )?
        .register(
            ServiceDescriptor::new("reservation_api")
                .with_route("/journeys")
                .with_route("/reservations/*")
                .with_var("api_key", "1234")
                .with_queue_producer("reservation_queue", "reservation_events")
                .with_durable_objects("reservation_objects", "ReservationRepository")
                .with_bucket("reservation", "reservation_bucket")
                .with_queue_consumer("reservation_events", policy("reservation_events-dlq")),
            Arc::new(RecordApi {
                objects_binding: "reservation_objects",
                producer_binding: "reservation_queue",
                bucket_binding: "reservation",
                projection_key: "availability",
            }),
        )?
        .register(
            ServiceDescriptor::new("buckets")
                .with_route("/buckets/*")
                .with_bucket("scheduling", "scheduling_bucket")
                .with_bucket("reservation", "reservation_bucket"),
            Arc::new(BucketProxy::new()),
        )?
        // The backoffice page answers for the bare site paths too.
        .page_alias("/", "/flight-scheduling")?
        .page_alias("/reservations", "/flight-scheduling")?
        .strip_prefix("/backoffice")?;
    builder.build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let harness = Arc::new(demo_platform()?);
    let addr: SocketAddr = std::env::var("HANGAR_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:5000".to_string())
        .parse()?;
    let edge = Edge::bind(addr, harness).await?;
    edge.serve().await?;
    Ok(())
}
