//! Demonstrates the full lifecycle against a local mock provider: the first setup mints and
//! encrypts a token, a watchlist drives a live-status lookup, and shutdown stops the periodic
//! checks.

// std
use std::{env, process, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use oauth2_token_keeper::{
	client::TokenClient,
	config::{ClientConfig, Endpoints, StorePaths},
	http::ReqwestHttpClient,
	manager::RefreshSettings,
	reqwest::Client,
	watchlist::Watchlist,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":5011271}",
			);
		})
		.await;
	let _validate_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/oauth2/validate")
				.header("Authorization", "Bearer demo-access");
			then.status(200).header("content-type", "application/json").body(
				"{\"client_id\":\"demo-client\",\"scopes\":[],\"expires_in\":5011271}",
			);
		})
		.await;
	let _streams_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/streams").query_param("user_login", "demo_streamer");
			then.status(200).header("content-type", "application/json").body(
				"{\"data\":[{\"user_login\":\"demo_streamer\",\"type\":\"live\",\"viewer_count\":42}]}",
			);
		})
		.await;
	let dir = env::temp_dir().join(format!("oauth2_token_keeper_demo_{}", process::id()));
	let config = ClientConfig::new("demo-client", "super-secret")?
		.with_endpoints(Endpoints::from_base(&server.base_url())?)
		.with_paths(StorePaths::in_dir(&dir))
		.with_refresh(RefreshSettings::default().with_check_every(Duration::from_secs(60)));
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let client = TokenClient::setup_with_http_client(config, http_client).await?;
	let watchlist = Watchlist::open(dir.join("watchlist.json"))?;

	watchlist.add(["Demo_Streamer"])?;

	let live = client.live_status(&watchlist.list()).await?;

	println!("Encrypted token stored under {}.", dir.display());
	println!("Live status: {}.", live.unwrap_or_default());

	client.shutdown().await;
	token_mock.assert_async().await;

	Ok(())
}
