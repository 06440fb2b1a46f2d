//! Echoes the body of every HTTP request received on a unix socket.
//!
//! ```text
//! cargo run --example unix_echo -- /tmp/micro-echo.sock
//! curl --unix-socket /tmp/micro-echo.sock -d 'hello' http://localhost/echo
//! ```

use std::env;
use std::sync::Arc;

use http::StatusCode;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};
use micro_presentation::PresentationError;
use micro_presentation::http1::{HttpPresentation, HttpPresentations};
use micro_session::unix::UnixServer;
use micro_session::{Server, Session};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let path = env::args().nth(1).unwrap_or_else(|| "/tmp/micro-echo.sock".to_string());
    let server = UnixServer::builder().path(&path).build();
    if let Err(e) = server.open().await {
        error!(cause = %e, "bind server error");
        return;
    }

    let presentations = Arc::new(HttpPresentations::new());
    let accept_loop = {
        let presentations = Arc::clone(&presentations);
        server.accept(move |accepted| {
            let session = match accepted {
                Ok(session) => session,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    return;
                }
            };

            let presentations = Arc::clone(&presentations);
            tokio::spawn(async move {
                let presentation = presentations.create(Arc::clone(&session) as Arc<dyn Session>);
                match echo(&presentation).await {
                    Ok(()) => info!("finished echo, connection shutdown"),
                    Err(e) => warn!(cause = %e, "echo failed, connection shutdown"),
                }
                presentations.close(&presentation);
                session.close();
            });
        })
    };

    let accept_loop = match accept_loop {
        Ok(accept_loop) => accept_loop,
        Err(e) => {
            error!(cause = %e, "failed to start accepting");
            return;
        }
    };

    info!(path = %path, "start listening");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(cause = %e, "failed to wait for ctrl-c");
    }

    server.shutdown();
    if let Err(e) = accept_loop.await {
        error!(cause = %e, "accept loop panicked");
    }
}

async fn echo(presentation: &HttpPresentation) -> Result<(), PresentationError> {
    while !presentation.get().await.0.is_finished() {
        presentation.session().read().await?;
        presentation.read().await?;
    }

    presentation
        .update(|(request, response)| {
            info!(method = %request.method(), path = request.uri().path(), "echo request");

            let body = request.body();
            response.set_status(StatusCode::OK);
            response.push_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
            response.push_header(CONTENT_LENGTH, HeaderValue::from(body.len()));
            response.push_chunk(body);
            response.finish();
        })
        .await;

    presentation.write().await?;
    Ok(())
}
