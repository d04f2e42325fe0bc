//! Retry controller behaviour against in-process upstreams.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{body::Body, routing::get, Router};
use bytes::Bytes;
use futures_util::stream;
use http::header::{CACHE_CONTROL, CONTENT_TYPE, SET_COOKIE};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::{Layer, ServiceExt};

use lazy_retry_proxy::config::RetryConfig;
use lazy_retry_proxy::http::{upstream_fn, ResponseSink, ResponseWriter, ServiceUpstream};
use lazy_retry_proxy::{RetryController, RetryLayer};

fn retry_config(max_attempts: u32, delay: Duration, codes: Option<Vec<u16>>) -> RetryConfig {
    RetryConfig {
        name: "scenario".into(),
        max_attempts,
        retry_delay: delay,
        retry_status_codes: codes,
    }
}

fn get_request(path: &str) -> Request<Bytes> {
    Request::get(path).body(Bytes::new()).unwrap()
}

/// Upstream answering with `statuses[n]` on call n (the last entry repeats).
fn scripted(
    statuses: &'static [u16],
    calls: Arc<AtomicU32>,
) -> impl Fn(&Request<Bytes>, &mut dyn ResponseSink) + Send + Sync {
    move |_: &Request<Bytes>, sink: &mut dyn ResponseSink| {
        let n = calls.fetch_add(1, Ordering::SeqCst) as usize;
        let code = statuses[n.min(statuses.len() - 1)];
        sink.set_status(StatusCode::from_u16(code).unwrap());
        sink.write_body(format!("attempt {} -> {}", n + 1, code).as_bytes());
    }
}

#[tokio::test]
async fn scenario_a_succeeds_on_third_attempt() {
    let calls = Arc::new(AtomicU32::new(0));
    let controller = RetryController::new(
        &retry_config(3, Duration::from_millis(10), None),
        upstream_fn(scripted(&[503, 503, 200], calls.clone())),
        "scenario-a",
    )
    .unwrap();

    let start = Instant::now();
    let mut writer = ResponseWriter::new();
    controller.handle(get_request("/a"), &mut writer).await;
    let elapsed = start.elapsed();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(writer.status(), StatusCode::OK);
    assert_eq!(writer.body(), b"attempt 3 -> 200");
    assert!(elapsed >= Duration::from_millis(20), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn scenario_b_code_outside_set_is_success() {
    let calls = Arc::new(AtomicU32::new(0));
    let controller = RetryController::new(
        &retry_config(2, Duration::from_millis(10), Some(vec![502, 503, 504])),
        upstream_fn(scripted(&[500], calls.clone())),
        "scenario-b",
    )
    .unwrap();

    let mut writer = ResponseWriter::new();
    controller.handle(get_request("/b"), &mut writer).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(writer.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(writer.body(), b"attempt 1 -> 500");
}

#[tokio::test]
async fn scenario_c_exhausts_and_returns_last_response() {
    let calls = Arc::new(AtomicU32::new(0));
    let controller = RetryController::new(
        &retry_config(5, Duration::from_millis(1), Some(vec![502, 503, 504])),
        upstream_fn(scripted(&[502], calls.clone())),
        "scenario-c",
    )
    .unwrap();

    let mut writer = ResponseWriter::new();
    controller.handle(get_request("/c"), &mut writer).await;

    assert_eq!(calls.load(Ordering::SeqCst), 5);
    assert_eq!(writer.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(writer.body(), b"attempt 5 -> 502");
}

#[tokio::test]
async fn invocations_stop_at_first_success_for_every_position() {
    for max_attempts in 1..=4u32 {
        for success_at in 1..=max_attempts {
            let calls = Arc::new(AtomicU32::new(0));
            let counter = calls.clone();
            let controller = RetryController::new(
                &retry_config(max_attempts, Duration::from_millis(1), None),
                upstream_fn(move |_, sink| {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    let status = if n < success_at {
                        StatusCode::SERVICE_UNAVAILABLE
                    } else {
                        StatusCode::OK
                    };
                    sink.set_status(status);
                    sink.write_body(n.to_string().as_bytes());
                }),
                "positions",
            )
            .unwrap();

            let mut writer = ResponseWriter::new();
            controller.handle(get_request("/"), &mut writer).await;

            assert_eq!(calls.load(Ordering::SeqCst), success_at);
            assert_eq!(writer.status(), StatusCode::OK);
            assert_eq!(writer.body(), success_at.to_string().as_bytes());
        }
    }
}

#[tokio::test]
async fn winning_response_is_reproduced_verbatim() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let app = Router::new().route(
        "/report",
        get(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    return http::Response::builder()
                        .status(StatusCode::SERVICE_UNAVAILABLE)
                        .header("x-failed", "yes")
                        .body(Body::from("try again"))
                        .unwrap();
                }
                let chunks = vec![
                    Ok::<_, std::io::Error>(Bytes::from_static(b"id,total\n")),
                    Ok(Bytes::from_static(b"1,10\n")),
                    Ok(Bytes::from_static(b"2,20\n")),
                ];
                http::Response::builder()
                    .status(StatusCode::OK)
                    .header(CONTENT_TYPE, "text/csv")
                    .header(SET_COOKIE, "session=abc")
                    .header(CACHE_CONTROL, "no-store")
                    .header(SET_COOKIE, "theme=dark")
                    .header(SET_COOKIE, "lang=en")
                    .body(Body::from_stream(stream::iter(chunks)))
                    .unwrap()
            }
        }),
    );

    let controller = RetryController::new(
        &retry_config(3, Duration::from_millis(1), None),
        ServiceUpstream::new(app),
        "fidelity",
    )
    .unwrap();

    let mut writer = ResponseWriter::new();
    controller.handle(get_request("/report"), &mut writer).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(writer.status(), StatusCode::OK);
    assert_eq!(writer.headers()[CONTENT_TYPE], "text/csv");
    assert_eq!(writer.headers()[CACHE_CONTROL], "no-store");
    assert!(writer.headers().get("x-failed").is_none());
    let cookies: Vec<_> = writer
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_owned())
        .collect();
    assert_eq!(cookies, ["session=abc", "theme=dark", "lang=en"]);
    assert_eq!(writer.body(), b"id,total\n1,10\n2,20\n");
}

#[tokio::test]
async fn single_and_multi_write_bodies_match() {
    let single = upstream_fn(|_, sink| {
        sink.set_status(StatusCode::OK);
        sink.write_body(b"alpha beta gamma");
    });
    let multi = upstream_fn(|_, sink| {
        sink.set_status(StatusCode::OK);
        for chunk in ["alpha", " ", "beta", " ", "gamma"] {
            sink.write_body(chunk.as_bytes());
        }
    });
    let config = retry_config(2, Duration::from_millis(1), None);

    let mut single_out = ResponseWriter::new();
    RetryController::new(&config, single, "single")
        .unwrap()
        .handle(get_request("/"), &mut single_out)
        .await;

    let mut multi_out = ResponseWriter::new();
    RetryController::new(&config, multi, "multi")
        .unwrap()
        .handle(get_request("/"), &mut multi_out)
        .await;

    assert_eq!(single_out.body(), b"alpha beta gamma");
    assert_eq!(multi_out.body(), single_out.body());
}

#[tokio::test]
async fn waiting_request_does_not_block_others() {
    let slow_calls = Arc::new(AtomicU32::new(0));
    let controller = Arc::new(
        RetryController::new(
            &retry_config(3, Duration::from_millis(100), None),
            upstream_fn({
                let slow_calls = slow_calls.clone();
                move |req: &Request<Bytes>, sink: &mut dyn ResponseSink| {
                    if req.uri().path() == "/flaky" {
                        slow_calls.fetch_add(1, Ordering::SeqCst);
                        sink.set_status(StatusCode::SERVICE_UNAVAILABLE);
                    } else {
                        sink.set_status(StatusCode::OK);
                    }
                }
            }),
            "concurrency",
        )
        .unwrap(),
    );

    let flaky = {
        let controller = controller.clone();
        tokio::spawn(async move {
            let mut writer = ResponseWriter::new();
            controller.handle(get_request("/flaky"), &mut writer).await;
            writer.status()
        })
    };

    // Give the flaky request time to enter its first wait.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let start = Instant::now();
    let mut writer = ResponseWriter::new();
    controller.handle(get_request("/healthy"), &mut writer).await;
    let healthy_elapsed = start.elapsed();

    assert_eq!(writer.status(), StatusCode::OK);
    assert!(healthy_elapsed < Duration::from_millis(100), "{healthy_elapsed:?}");

    assert_eq!(flaky.await.unwrap(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(slow_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn layer_wraps_router() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let app = Router::new().route(
        "/flaky",
        get(move || {
            let counter = counter.clone();
            async move {
                match counter.fetch_add(1, Ordering::SeqCst) {
                    0 => (StatusCode::BAD_GATEWAY, "down"),
                    _ => (StatusCode::OK, "up"),
                }
            }
        }),
    );
    let service = RetryLayer::new(&retry_config(3, Duration::from_millis(5), None))
        .unwrap()
        .layer(app);

    let response = service
        .oneshot(Request::get("/flaky").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"up");
}
