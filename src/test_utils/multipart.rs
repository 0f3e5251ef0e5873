use axum::{
    extract::{FromRequest, Multipart},
    http::Request,
};

use crate::{csv_import::FILE_FIELD, endpoints};

/// Build the raw body of a multipart form with one file field.
fn multipart_body(file_name: &str, content_type: &str, contents: &str) -> String {
    [
        format!("--{MULTIPART_BOUNDARY}"),
        format!(
            "Content-Disposition: form-data; name=\"{FILE_FIELD}\"; filename=\"{file_name}\""
        ),
        format!("Content-Type: {content_type}"),
        String::new(),
        contents.to_owned(),
        format!("--{MULTIPART_BOUNDARY}--"),
    ]
    .join("\r\n")
}

const MULTIPART_BOUNDARY: &str = "MY_BOUNDARY123456789";

/// Parse a multipart upload request with one file field.
pub(crate) async fn must_make_multipart(
    file_name: &str,
    content_type: &str,
    contents: &str,
) -> Multipart {
    let request = Request::builder()
        .method("POST")
        .uri(endpoints::UPLOAD)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(multipart_body(file_name, content_type, contents).into())
        .unwrap();

    Multipart::from_request(request, &{}).await.unwrap()
}
