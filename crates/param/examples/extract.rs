use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, Request};
use http_body_util::Full;
use micro_param::{ParamReader, ParamRequest, PathParams};
use serde::Deserialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Deserialize, Debug, Default)]
pub struct Order {
    item: String,
    quantity: u32,
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut router = matchit::Router::new();
    router.insert("/shops/{shop}/orders", "orders").unwrap();

    let reader = ParamReader::new();

    // a form post routed by matchit, the body is gathered from an async body first
    let request = Request::builder()
        .method(Method::POST)
        .uri("/shops/berlin/orders?page=2")
        .header(CONTENT_TYPE, mime::APPLICATION_WWW_FORM_URLENCODED.essence_str())
        .body(Full::new(Bytes::from("note=gift+wrap&total=1.299%2C90")))
        .unwrap();
    let matched = router.at(request.uri().path()).unwrap();
    let path_params = PathParams::from(matched.params);
    let mut req = ParamRequest::collect(request, path_params).await.unwrap();

    info!(
        shop = %reader.string(&mut req, "shop", 16),
        page = reader.int(&mut req, "page"),
        note = %reader.string(&mut req, "note", 4),
        total = reader.float(&mut req, "total", ','),
        "form order"
    );

    // a json post decoded straight into the order
    let request = Request::builder()
        .method(Method::POST)
        .uri("/shops/paris/orders")
        .header(CONTENT_TYPE, mime::APPLICATION_JSON.essence_str())
        .body(Full::new(Bytes::from(r#"{"item":"lamp","quantity":2}"#)))
        .unwrap();
    let mut req = ParamRequest::collect(request, PathParams::empty()).await.unwrap();

    let mut order = Order::default();
    match reader.decode_body(&mut req, &mut order, true) {
        Ok(()) => info!(item = %order.item, quantity = order.quantity, "json order"),
        Err(e) => info!(cause = %e, "bad json order"),
    }
}
