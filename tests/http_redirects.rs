use easyfetch::{Fetcher, TransferOption};
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn start_server() -> (Runtime, MockServer) {
    easyfetch::logging::try_init_for_tests();
    let runtime = Runtime::new().expect("runtime");
    let server = runtime.block_on(MockServer::start());
    (runtime, server)
}

fn mount_redirect(runtime: &Runtime, server: &MockServer) {
    runtime.block_on(async {
        Mock::given(method("GET"))
            .and(path("/start"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/final"))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/final"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(server)
            .await;
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn test_redirects_not_followed_by_default() {
    if !can_bind_localhost() {
        return;
    }

    let (runtime, server) = start_server();
    mount_redirect(&runtime, &server);

    let mut fetcher = Fetcher::new().expect("fetcher should build");
    let response = fetcher
        .fetch_response(&format!("{}/start", server.uri()), false, true)
        .expect("request should succeed");
    assert_eq!(response.status, 302);
    assert_eq!(response.header("location"), Some("/final"));

    let requests = runtime.block_on(server.received_requests()).expect("requests");
    assert_eq!(requests.len(), 1);
}

#[cfg_attr(miri, ignore)]
#[test]
fn test_follow_redirects_option() {
    if !can_bind_localhost() {
        return;
    }

    let (runtime, server) = start_server();
    mount_redirect(&runtime, &server);

    let mut fetcher = Fetcher::new().expect("fetcher should build");
    fetcher
        .set_option(TransferOption::FollowRedirects(true))
        .expect("follow");
    let body = fetcher
        .fetch(&format!("{}/start", server.uri()), false, true)
        .expect("request should succeed");
    assert_eq!(body, "ok");

    let requests = runtime.block_on(server.received_requests()).expect("requests");
    assert_eq!(requests.len(), 2);
}

#[cfg_attr(miri, ignore)]
#[test]
fn test_redirect_limit_exceeded_is_error() {
    if !can_bind_localhost() {
        return;
    }

    let (runtime, server) = start_server();
    runtime.block_on(
        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
            .mount(&server),
    );

    let mut fetcher = Fetcher::new().expect("fetcher should build");
    fetcher
        .set_option(TransferOption::FollowRedirects(true))
        .expect("follow");
    fetcher.set_option(TransferOption::MaxRedirects(2)).expect("max");
    let err = fetcher
        .fetch(&format!("{}/loop", server.uri()), false, true)
        .expect_err("redirect loop");
    assert!(matches!(err, easyfetch::FetchError::Http(_)));
}
