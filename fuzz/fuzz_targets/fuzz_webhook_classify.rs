#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Request {
    post: bool,
    url: String,
    content_type: Option<String>,
    body: Vec<u8>,
}

fuzz_target!(|req: Request| {
    let Ok(filter) = garage_core::WebhookFilter::new(&garage_core::WebhookCfg::default()) else {
        return;
    };
    let method = if req.post { "POST" } else { "GET" };
    let mut body = req.body.as_slice();
    if let Err(e) = filter.classify(method, &req.url, req.content_type.as_deref(), &mut body) {
        assert!(matches!(e.status(), 404 | 405 | 415 | 500));
    }
});
