use std::sync::Arc;

use bytes::Bytes;
use futures::channel::oneshot;
use http::header::{CONTENT_LENGTH, HOST, HeaderValue, TRANSFER_ENCODING};
use http::{Method, StatusCode, Uri};
use micro_presentation::PresentationError;
use micro_presentation::http1::{HttpClientPresentation, HttpClientPresentations, HttpPresentation, HttpPresentations};
use micro_session::unix::UnixServer;
use micro_session::{Registered, Server, Session, SessionError};

/// Reads from the session until the server side has a complete request.
async fn read_request(presentation: &HttpPresentation) {
    while !presentation.get().await.0.is_finished() {
        presentation.session().read().await.unwrap();
        presentation.read().await.unwrap();
    }
}

/// Reads from the session until the client side has a complete response.
async fn read_response(presentation: &HttpClientPresentation) {
    while !presentation.get().await.1.is_finished() {
        presentation.session().read().await.unwrap();
        presentation.read().await.unwrap();
    }
}

#[tokio::test]
async fn server_reads_request_and_response_stays_independent() {
    let server = UnixServer::builder().build();
    let (server_side, client_side) = server.pair().unwrap();
    let presentations = HttpPresentations::new();
    let presentation = presentations.create(server_side);

    client_side.buffers().lock().await.write.extend_from_slice(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
    client_side.write().await.unwrap();

    read_request(&presentation).await;

    let (request, response) = presentation.get().await;
    assert_eq!(request.method(), &Method::GET);
    assert_eq!(request.uri().path(), "/");
    assert_eq!(request.host(), Some("x"));
    assert!(!response.status_line_finished());

    presentation
        .update(|(_, response)| {
            response.set_status(StatusCode::NOT_FOUND);
            response.push_header(CONTENT_LENGTH, HeaderValue::from(0));
            response.finish();
        })
        .await;

    let (request_after, response_after) = presentation.get().await;
    assert_eq!(request_after.headers(), request.headers());
    assert_eq!(request_after.host(), Some("x"));
    assert_eq!(response_after.status(), StatusCode::NOT_FOUND);
    assert!(presentation.session().buffers().lock().await.read.is_empty());
}

#[tokio::test]
async fn chunked_response_streams_to_client() {
    let server = UnixServer::builder().build();
    let (server_side, client_side) = server.pair().unwrap();
    let servers = HttpPresentations::new();
    let clients = HttpClientPresentations::new();
    let on_server = servers.create(server_side);
    let on_client = clients.create(client_side);

    on_client
        .update(|(request, _)| {
            request.set_method(Method::GET);
            request.set_uri(Uri::from_static("/stream"));
            request.push_header(HOST, HeaderValue::from_static("localhost"));
            request.finish();
        })
        .await;
    on_client.write().await.unwrap();
    read_request(&on_server).await;
    assert_eq!(on_server.get().await.0.uri().path(), "/stream");

    on_server
        .update(|(_, response)| {
            response.push_header(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
            response.push_chunk(Bytes::from_static(b"first "));
        })
        .await;
    on_server.write().await.unwrap();

    on_server
        .update(|(_, response)| {
            response.push_chunk(Bytes::from_static(b"second"));
            response.finish();
        })
        .await;
    on_server.write().await.unwrap();

    read_response(&on_client).await;

    let (request, response) = on_client.get().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&response.body()[..], b"first second");
    assert!(response.is_complete());
    assert!(request.is_complete());

    let (_, sent) = on_server.get().await;
    assert_eq!(sent.next_header(), 1);
    assert_eq!(sent.next_chunk(), 2);
    assert!(sent.is_complete());
}

#[tokio::test]
async fn failed_flush_keeps_bytes_staged() {
    let server = UnixServer::builder().build();
    let (server_side, client_side) = server.pair().unwrap();
    let presentations = HttpPresentations::new();
    let presentation = presentations.create(server_side);

    server.close(&client_side);
    drop(client_side);

    presentation
        .update(|(_, response)| {
            response.push_header(CONTENT_LENGTH, HeaderValue::from(5));
            response.push_chunk(Bytes::from_static(b"hello"));
            response.finish();
        })
        .await;

    let first = presentation.write().await;
    assert!(matches!(first, Err(PresentationError::Session { source: SessionError::Io { .. } })));

    let (_, response) = presentation.get().await;
    assert!(response.is_complete());
    let staged = presentation.session().buffers().lock().await.write.clone();
    assert!(staged.starts_with(b"HTTP/1.1 200 OK\r\n"));
    assert!(staged.ends_with(b"hello"));

    let retry = presentation.write().await;
    assert!(retry.is_err());
    assert_eq!(presentation.session().buffers().lock().await.write, staged);
}

#[tokio::test]
async fn callbacks_run_after_conversion() {
    let server = UnixServer::builder().build();
    let (server_side, client_side) = server.pair().unwrap();
    let servers = HttpPresentations::new();
    let clients = HttpClientPresentations::new();
    let on_server = servers.create(server_side);
    let on_client = clients.create(client_side);

    on_client
        .update(|(request, _)| {
            request.set_method(Method::POST);
            request.set_uri(Uri::from_static("/echo"));
            request.push_header(CONTENT_LENGTH, HeaderValue::from(4));
            request.push_chunk(Bytes::from_static(b"ping"));
            request.finish();
        })
        .await;

    let (tx, rx) = oneshot::channel();
    Arc::clone(&on_client).async_write(move |result| {
        let _ = tx.send(result);
    });
    let written = rx.await.unwrap().unwrap();
    assert!(written > 4);

    let mut received = 0;
    while received < written {
        let (tx, rx) = oneshot::channel();
        let observer = Arc::clone(&on_server);
        Arc::clone(&on_server).async_read(move |result| {
            // the conversion has already happened, so the lock is free
            let lock_free = observer.session().buffers().try_lock().is_ok();
            let _ = tx.send((result, lock_free));
        });
        let (result, lock_free) = rx.await.unwrap();
        received += result.unwrap();
        assert!(lock_free);
    }

    let (request, _) = on_server.get().await;
    assert_eq!(request.method(), &Method::POST);
    assert_eq!(&request.body()[..], b"ping");
    assert!(request.is_finished());
}

#[tokio::test]
async fn closed_presentation_reports_closed_to_callbacks() {
    let server = UnixServer::builder().build();
    let (server_side, _client_side) = server.pair().unwrap();
    let presentations = HttpPresentations::new();
    let presentation = presentations.create(server_side);

    presentations.close(&presentation);

    let (tx, rx) = oneshot::channel();
    Arc::clone(&presentation).async_read(move |result| {
        let _ = tx.send(result);
    });
    assert!(matches!(rx.await.unwrap(), Err(PresentationError::Closed)));

    let (tx, rx) = oneshot::channel();
    presentation.async_write(move |result| {
        let _ = tx.send(result);
    });
    assert!(matches!(rx.await.unwrap(), Err(PresentationError::Closed)));
}

#[tokio::test]
async fn connect_binds_presentation_to_client_session() {
    let dir = tempfile::tempdir().unwrap();
    let server = UnixServer::builder().path(dir.path().join("http.sock")).build();
    server.open().await.unwrap();

    let clients = HttpClientPresentations::new();
    let (client, accepted) = tokio::join!(clients.connect(&server), server.accept_one());
    let client = client.unwrap();
    let accepted = accepted.unwrap();

    assert_eq!(clients.len(), 1);
    assert!(server.sessions().contains(client.session().handle()));
    assert!(server.sessions().contains(accepted.handle()));

    server.shutdown();
    assert!(client.is_closed());
    assert!(matches!(client.write().await, Err(PresentationError::Session { source: SessionError::Closed })));
}
