mod common;

// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use httpmock::prelude::*;
use wiremock::{ResponseTemplate, matchers};
// self
use common::{closed_port_url, parse_url, test_executor};
use oauth2_token_keeper::{
	error::{Error, LastAttempt},
	http::{ResponseValidator, RetryRequest, validator},
	url::Url,
};

fn mock_url(server: &MockServer, path: &str) -> Url {
	parse_url(&server.url(path))
}

/// Mounts a wiremock responder that answers the `n`th call (zero-based) with `script(n)`.
async fn scripted_server<F>(
	http_method: &str,
	route: &str,
	expected_calls: u64,
	script: F,
) -> wiremock::MockServer
where
	F: 'static + Fn(usize) -> ResponseTemplate + Send + Sync,
{
	let server = wiremock::MockServer::start().await;
	let calls = AtomicUsize::new(0);

	wiremock::Mock::given(matchers::method(http_method))
		.and(matchers::path(route))
		.respond_with(move |_: &wiremock::Request| script(calls.fetch_add(1, Ordering::SeqCst)))
		.expect(expected_calls)
		.mount(&server)
		.await;

	server
}

#[tokio::test]
async fn retries_past_server_errors_and_uses_first_accepted_response() {
	let server = scripted_server("POST", "/oauth2/token", 4, |n| match n {
		0..=2 =>
			ResponseTemplate::new(500).set_body_string(format!("{{\"error\":\"attempt {n}\"}}")),
		_ => ResponseTemplate::new(200)
			.insert_header("content-type", "application/json")
			.set_body_string(format!("{{\"access_token\":\"attempt-{n}\"}}")),
	})
	.await;
	let request = RetryRequest::post(parse_url(&format!("{}/oauth2/token", server.uri())))
		.form("grant_type", "client_credentials")
		.validator(validator::has_access_token())
		.retries(5)
		.critical(true);
	let body = test_executor()
		.execute(&request)
		.await
		.expect("The fourth attempt should be accepted.")
		.expect("Accepted attempts always carry a body.");

	assert_eq!(body["access_token"], "attempt-3");

	let received = server.received_requests().await.expect("Request recording should be on.");

	assert_eq!(received.len(), 4);
}

#[tokio::test]
async fn critical_request_fails_after_exhausting_every_attempt() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(500)
				.header("content-type", "application/json")
				.body("{\"error\":\"down\"}");
		})
		.await;
	let request = RetryRequest::post(mock_url(&server, "/oauth2/token"))
		.validator(validator::has_access_token())
		.retries(5)
		.critical(true);
	let err = test_executor()
		.execute(&request)
		.await
		.expect_err("Five server errors should exhaust a critical request.");

	match err {
		Error::RetriesExhausted {
			attempts,
			last: LastAttempt::Rejected { status, body_preview },
			..
		} => {
			assert_eq!(attempts, 5);
			assert_eq!(status, 500);
			assert!(body_preview.contains("down"));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	mock.assert_calls_async(5).await;
}

#[tokio::test]
async fn non_critical_request_degrades_to_none_after_same_attempts() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/streams");
			then.status(200).header("content-type", "application/json").body("{\"data\":[]}");
		})
		.await;
	let request = RetryRequest::get(mock_url(&server, "/streams"))
		.validator(ResponseValidator::new("never", |_| false))
		.retries(3);
	let body = test_executor()
		.execute(&request)
		.await
		.expect("Non-critical exhaustion should not be an error.");

	assert!(body.is_none());

	mock.assert_calls_async(3).await;
}

#[tokio::test]
async fn every_validator_runs_on_every_attempt() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/check");
			then.status(200).header("content-type", "application/json").body("{\"ok\":true}");
		})
		.await;
	let rejecting = Arc::new(AtomicUsize::new(0));
	let observing = Arc::new(AtomicUsize::new(0));
	let request = {
		let rejecting = rejecting.clone();
		let observing = observing.clone();

		RetryRequest::get(mock_url(&server, "/check"))
			.validator(ResponseValidator::new("rejecting", move |_| {
				rejecting.fetch_add(1, Ordering::SeqCst);

				false
			}))
			.validator(ResponseValidator::new("observing", move |_| {
				observing.fetch_add(1, Ordering::SeqCst);

				true
			}))
			.retries(4)
	};
	let body = test_executor()
		.execute(&request)
		.await
		.expect("Non-critical exhaustion should not be an error.");

	assert!(body.is_none());
	assert_eq!(rejecting.load(Ordering::SeqCst), 4);
	assert_eq!(observing.load(Ordering::SeqCst), 4, "Later validators must not be skipped.");

	mock.assert_calls_async(4).await;
}

#[tokio::test]
async fn transport_failures_are_carried_when_no_response_arrived() {
	let request = RetryRequest::get(closed_port_url())
		.retries(2)
		.timeout(Duration::from_secs(2))
		.critical(true);
	let err = test_executor()
		.execute(&request)
		.await
		.expect_err("An unreachable host should exhaust a critical request.");

	assert!(matches!(
		err,
		Error::RetriesExhausted { attempts: 2, last: LastAttempt::Transport(_), .. }
	));
}

#[tokio::test]
async fn accepted_non_json_body_is_retried_like_a_transport_failure() {
	let server = scripted_server("GET", "/value", 2, |n| match n {
		0 => ResponseTemplate::new(200).set_body_string("not json"),
		_ => ResponseTemplate::new(200).set_body_string("{\"value\":1}"),
	})
	.await;
	let request = RetryRequest::get(parse_url(&format!("{}/value", server.uri()))).retries(3);
	let body = test_executor()
		.execute(&request)
		.await
		.expect("The second attempt should be accepted.")
		.expect("Accepted attempts always carry a body.");

	assert_eq!(body["value"], 1);
}

#[tokio::test]
async fn slow_responses_time_out_and_count_as_attempts() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/slow");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"value\":1}")
				.delay(Duration::from_millis(800));
		})
		.await;
	let request = RetryRequest::get(mock_url(&server, "/slow"))
		.retries(3)
		.timeout(Duration::from_millis(100))
		.critical(true);
	let err = test_executor()
		.execute(&request)
		.await
		.expect_err("Every attempt should time out.");

	assert!(matches!(
		err,
		Error::RetriesExhausted { attempts: 3, last: LastAttempt::Transport(_), .. }
	));

	mock.assert_calls_async(3).await;
}

#[tokio::test]
async fn query_and_headers_reach_the_server() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/streams")
				.query_param("user_login", "alpha")
				.query_param("user_login", "beta")
				.header("Client-ID", "client-123");
			then.status(200).header("content-type", "application/json").body("{\"data\":[1]}");
		})
		.await;
	let request = RetryRequest::get(mock_url(&server, "/streams"))
		.header("Client-ID", "client-123")
		.query("user_login", "alpha")
		.query("user_login", "beta")
		.retries(1);
	let body = test_executor()
		.execute(&request)
		.await
		.expect("Matching request should succeed.")
		.expect("Accepted attempts always carry a body.");

	assert_eq!(body["data"][0], 1);

	mock.assert_async().await;
}
