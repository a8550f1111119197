#![cfg(feature = "signed")]

// Tests for expiry policy behavior: how expiry settings map to cookie Max-Age, and how the
// stored record's expiry date moves as the middleware re-saves the session on every request.
mod common;

use time::{Duration, OffsetDateTime};
use tower::{ServiceBuilder, ServiceExt as _};

use tower_sessions_context::{Expiry, SessionContextConfig};

use common::FaultyStore;

fn assert_max_age_seconds_close(cookie: &tower_cookies::Cookie<'_>, expected_seconds: i64) {
    // Max-Age is computed relative to "now", so assertions allow a small amount of clock drift.
    let actual_seconds = cookie
        .max_age()
        .expect("session cookie has max-age")
        .whole_seconds();
    assert!((actual_seconds - expected_seconds).abs() <= 1);
}

#[tokio::test]
async fn expiry_on_session_end() {
    // Exercise: `Expiry::OnSessionEnd`.
    // Expectation: cookie has no Max-Age (session cookie).
    let config = SessionContextConfig::default().with_expiry(Expiry::OnSessionEnd);
    let (_key, layer) = common::make_signed_layer(FaultyStore::default(), config);
    let svc = ServiceBuilder::new()
        .layer(layer)
        .service_fn(common::context_handler);

    let res = svc
        .oneshot(common::request("/", None))
        .await
        .expect("service call succeeds");
    let session_cookie = common::get_session_cookie(&res);

    assert!(session_cookie.max_age().is_none());
}

#[tokio::test]
async fn expiry_on_inactivity() {
    // Exercise: `Expiry::OnInactivity(d)`.
    // Expectation: cookie Max-Age is approximately `d`.
    let inactivity = Duration::hours(2);
    let config = SessionContextConfig::default().with_expiry(Expiry::OnInactivity(inactivity));
    let (_key, layer) = common::make_signed_layer(FaultyStore::default(), config);
    let svc = ServiceBuilder::new()
        .layer(layer)
        .service_fn(common::context_handler);

    let res = svc
        .oneshot(common::request("/", None))
        .await
        .expect("service call succeeds");
    let session_cookie = common::get_session_cookie(&res);

    assert_max_age_seconds_close(&session_cookie, inactivity.whole_seconds());
}

#[tokio::test]
async fn expiry_at_date_time() {
    // Exercise: `Expiry::AtDateTime(t)`.
    // Expectation: cookie Max-Age is approximately `t - now`.
    let expiry_time = OffsetDateTime::now_utc() + Duration::weeks(1);
    let config = SessionContextConfig::default().with_expiry(Expiry::AtDateTime(expiry_time));
    let (_key, layer) = common::make_signed_layer(FaultyStore::default(), config);
    let svc = ServiceBuilder::new()
        .layer(layer)
        .service_fn(common::context_handler);

    let res = svc
        .oneshot(common::request("/", None))
        .await
        .expect("service call succeeds");
    let session_cookie = common::get_session_cookie(&res);

    let expected = (expiry_time - OffsetDateTime::now_utc()).whole_seconds();
    assert_max_age_seconds_close(&session_cookie, expected);
}

#[tokio::test]
async fn inactivity_expiry_slides_on_every_request() {
    // Exercise: a second request with the same cookie under inactivity expiry.
    // Expectation: the middleware re-saves the session, so the stored expiry date moves forward
    // while the session id stays the same.
    let inactivity = Duration::hours(2);
    let store = FaultyStore::default();
    let config = SessionContextConfig::default().with_expiry(Expiry::OnInactivity(inactivity));
    let (key, layer) = common::make_signed_layer(store.clone(), config);
    let svc = ServiceBuilder::new()
        .layer(layer)
        .service_fn(common::context_handler);

    let res1 = svc
        .clone()
        .oneshot(common::request("/", None))
        .await
        .expect("service call succeeds");
    let cookie1 = common::get_session_cookie(&res1);
    let id = common::session_id(cookie1.clone(), &key);
    let rec1 = store.record(&id).await.expect("session was persisted");

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let res2 = svc
        .oneshot(common::request("/", Some(&cookie1)))
        .await
        .expect("service call succeeds");
    let cookie2 = common::get_session_cookie(&res2);
    let rec2 = store.record(&id).await.expect("session still stored");

    assert_max_age_seconds_close(&cookie2, inactivity.whole_seconds());
    assert_eq!(common::session_id(cookie2, &key), id);
    assert!(rec1.expiry_date < rec2.expiry_date);
}

#[tokio::test]
async fn absolute_expiry_does_not_move() {
    // Exercise: a second request with the same cookie under an absolute expiry.
    // Expectation: the record keeps its absolute expiry date and Max-Age stays near `t - now`.
    let expiry_time = OffsetDateTime::now_utc() + Duration::weeks(1);
    let store = FaultyStore::default();
    let config = SessionContextConfig::default().with_expiry(Expiry::AtDateTime(expiry_time));
    let (key, layer) = common::make_signed_layer(store.clone(), config);
    let svc = ServiceBuilder::new()
        .layer(layer)
        .service_fn(common::context_handler);

    let res1 = svc
        .clone()
        .oneshot(common::request("/", None))
        .await
        .expect("service call succeeds");
    let cookie1 = common::get_session_cookie(&res1);
    let id = common::session_id(cookie1.clone(), &key);
    let rec1 = store.record(&id).await.expect("session was persisted");

    let res2 = svc
        .oneshot(common::request("/", Some(&cookie1)))
        .await
        .expect("service call succeeds");
    let cookie2 = common::get_session_cookie(&res2);
    let rec2 = store.record(&id).await.expect("session still stored");

    let expected = (expiry_time - OffsetDateTime::now_utc()).whole_seconds();
    assert_max_age_seconds_close(&cookie2, expected);
    assert_eq!(rec1.expiry_date, rec2.expiry_date);
}
