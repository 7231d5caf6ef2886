use std::fs;
use std::path::Path;

use dynpages::{serve, Outcome, ServerConfig};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn acme_config() -> ServerConfig {
    ServerConfig {
        server_name: "Acme".to_string(),
        ..ServerConfig::default()
    }
}

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

async fn page_text(root: &Path, url: &str) -> String {
    match serve(root, &acme_config(), url).await {
        Outcome::Page(text) => text,
        other => panic!("expected a page for {url}, got {other:?}"),
    }
}

#[tokio::test]
async fn server_name_expression_renders() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("page_home.py"),
        "<h1>{{ context.server_name }}</h1>",
    );
    assert_eq!(page_text(dir.path(), "/").await, "<h1>Acme</h1>");
}

#[tokio::test]
async fn bare_identifier_include_concatenates_in_source_order() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("page_home.py"),
        "<main>body</main>\n{{ page_home_footer }}",
    );
    write(
        &dir.path().join("page_home_footer.py"),
        "<footer>Acme</footer>",
    );
    assert_eq!(
        page_text(dir.path(), "/home").await,
        "<main>body</main>\n<footer>Acme</footer>"
    );
}

#[tokio::test]
async fn traversal_marker_never_leaks_file_contents() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("a").join("b").join("page_deep.py"),
        "{{ ../../etc/secret }}",
    );
    // The reference collapses back under the root where nothing exists;
    // a variant with one more step would escape outright. Both substitute
    // the same placeholder.
    let out = page_text(dir.path(), "/a/b/deep").await;
    assert_eq!(
        out,
        "[Error: File '../../etc/secret' not found or access denied]"
    );

    write(
        &dir.path().join("a").join("b").join("page_deeper.py"),
        "{{ ../../../etc/passwd }}",
    );
    let out = page_text(dir.path(), "/a/b/deeper").await;
    assert_eq!(
        out,
        "[Error: File '../../../etc/passwd' not found or access denied]"
    );
    assert!(!out.contains("root:"));
}

#[tokio::test]
async fn missing_fragment_keeps_rest_of_page() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("page_home.py"),
        "<p>before</p>{{ missing_fragment }}<p>after</p>",
    );
    assert_eq!(
        page_text(dir.path(), "/home").await,
        "<p>before</p>[Error: name 'missing_fragment' is not defined]<p>after</p>"
    );
}

#[tokio::test]
async fn private_directory_request_is_denied() {
    let dir = TempDir::new().unwrap();
    let secret = dir.path().join("secret");
    fs::create_dir_all(&secret).unwrap();
    fs::write(secret.join(".private"), "").unwrap();
    fs::write(secret.join("report.txt"), "classified").unwrap();
    match serve(dir.path(), &acme_config(), "/secret").await {
        Outcome::Denied(_) => {}
        other => panic!("expected denial, got {other:?}"),
    }
    match serve(dir.path(), &acme_config(), "/secret/report.txt").await {
        Outcome::Denied(_) => {}
        other => panic!("expected denial, got {other:?}"),
    }
}

#[tokio::test]
async fn routes_listing_is_available_to_pages() {
    let dir = TempDir::new().unwrap();
    write(&dir.path().join("page_home.py"), "{{ context.routes }}");
    write(&dir.path().join("page_about.py"), "about");
    assert_eq!(
        page_text(dir.path(), "/home").await,
        r#"["about","home"]"#
    );
}

#[tokio::test]
async fn nested_explicit_includes_expand_recursively() {
    let dir = TempDir::new().unwrap();
    write(&dir.path().join("page_home.py"), "A{{ ./parts/outer.py }}D");
    write(&dir.path().join("parts").join("outer.py"), "B{{ ./inner.py }}");
    write(&dir.path().join("parts").join("inner.py"), "C");
    assert_eq!(page_text(dir.path(), "/home").await, "ABCD");
}

#[tokio::test]
async fn non_ascii_marker_content_still_renders() {
    let dir = TempDir::new().unwrap();
    let content = dir.path().join("content").join("café");
    fs::create_dir_all(&content).unwrap();
    fs::write(content.join("menü.txt"), "").unwrap();
    write(
        &dir.path().join("page_home.py"),
        "<p>überschrift</p>{{ await context.resources.list_content('café') }}",
    );
    // Multibyte characters in literal text and in a quoted argument must
    // never abort the request.
    assert_eq!(
        page_text(dir.path(), "/home").await,
        "<p>überschrift</p>[\"menü.txt\"]"
    );
}

#[tokio::test]
async fn awaited_resource_call_renders() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("page_home.py"),
        "ip: {{ await context.resources.get_public_ip() }}",
    );
    assert_eq!(page_text(dir.path(), "/home").await, "ip: 127.0.0.1");
}
