//! Local stand-ins for Sesame, SDSS ImgCutout and SkyView
//!
//! Bound to 127.0.0.1:0 so tests never reach the real services.
//!
//! - `GET  /sesame?<name>`      M81 resolves, anything else is "Nothing found"
//! - `GET  /sdss/getjpeg`       synthetic galaxy PNG
//! - `GET  /missing/getjpeg`    404
//! - `POST /skyview`            HTML linking `/images/<survey>.png`;
//!   survey `EMPTY` answers without any link
//! - `POST /slow-skyview`       same, after a long delay
//! - `GET  /images/:file`       synthetic galaxy PNG

use astro_ai::analysis::synthetic::gaussian_blob_u8;
use astro_ai::config::PipelineConfig;
use axum::{
    extract::{Form, RawQuery, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Router,
};
use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long `/slow-skyview` stalls before answering
pub const SLOW_SURVEY_DELAY: Duration = Duration::from_secs(10);

pub const M81_RA: f64 = 148.8882194;
pub const M81_DEC: f64 = 69.06529514;

/// Synthetic elliptical galaxy encoded as PNG
pub fn blob_png(rows: u32, cols: u32) -> Vec<u8> {
    let blob = gaussian_blob_u8(rows as usize, cols as usize);
    let buffer = image::ImageBuffer::from_fn(cols, rows, |x, y| {
        image::Luma([blob[[y as usize, x as usize]]])
    });
    let mut png = Cursor::new(Vec::new());
    buffer
        .write_to(&mut png, image::ImageFormat::Png)
        .expect("Failed to encode PNG");
    png.into_inner()
}

#[derive(Clone, Default)]
struct Counters {
    total: Arc<AtomicUsize>,
    sesame: Arc<AtomicUsize>,
    skyview: Arc<AtomicUsize>,
}

impl Counters {
    fn hit(&self, counter: &AtomicUsize) {
        self.total.fetch_add(1, Ordering::SeqCst);
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// Running stub server
pub struct StubUpstream {
    addr: SocketAddr,
    counters: Counters,
}

async fn sesame(State(c): State<Counters>, RawQuery(query): RawQuery) -> String {
    c.hit(&c.sesame);
    let name = query
        .as_deref()
        .and_then(|q| urlencoding::decode(q).ok())
        .map(|n| n.into_owned())
        .unwrap_or_default();

    if name == "M81" {
        format!(
            "# M81\t#Q1\n#=Simbad: 1\n%J {:.8} +{:.8} = 09:55:33.17 +69:03:55.0\n%I.0 M 81\n",
            M81_RA, M81_DEC
        )
    } else {
        format!("# {}\n#! *** Nothing found *** \n", name)
    }
}

async fn png(State(c): State<Counters>) -> impl IntoResponse {
    c.total.fetch_add(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "image/png")], blob_png(48, 64))
}

async fn missing(State(c): State<Counters>) -> StatusCode {
    c.total.fetch_add(1, Ordering::SeqCst);
    StatusCode::NOT_FOUND
}

async fn skyview(State(c): State<Counters>, Form(form): Form<HashMap<String, String>>) -> Html<String> {
    c.hit(&c.skyview);
    let survey = form.get("Survey").cloned().unwrap_or_default();
    let body = if survey == "EMPTY" {
        "<html><body>No images for this position.</body></html>".to_string()
    } else {
        format!(
            "<html><body><h1>Results</h1>\
             <a href=\"/help.html\">help</a>\
             <a href=\"/images/{}.png\">Image</a></body></html>",
            survey.to_lowercase()
        )
    };
    Html(body)
}

async fn slow_skyview(
    state: State<Counters>,
    form: Form<HashMap<String, String>>,
) -> Html<String> {
    tokio::time::sleep(SLOW_SURVEY_DELAY).await;
    skyview(state, form).await
}

impl StubUpstream {
    pub async fn start() -> Self {
        let counters = Counters::default();
        let app = Router::new()
            .route("/sesame", get(sesame))
            .route("/sdss/getjpeg", get(png))
            .route("/missing/getjpeg", get(missing))
            .route("/skyview", post(skyview))
            .route("/slow-skyview", post(slow_skyview))
            .route("/images/:file", get(png))
            .with_state(counters.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub upstream");
        let addr = listener.local_addr().expect("Stub has no local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Stub upstream failed");
        });

        Self { addr, counters }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Pipeline pointed at this stub with short timeouts
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            sesame_url: self.url("/sesame"),
            sdss_cutout_url: self.url("/sdss/getjpeg"),
            skyview_url: self.url("/skyview"),
            name_resolution_timeout_secs: 5,
            download_timeout_secs: 5,
            survey_timeout_secs: 5,
            ..Default::default()
        }
    }

    /// Same, but the fast-path catalog answers 404
    pub fn pipeline_config_without_sdss(&self) -> PipelineConfig {
        PipelineConfig {
            sdss_cutout_url: self.url("/missing/getjpeg"),
            ..self.pipeline_config()
        }
    }

    /// Survey endpoint that stalls for [`SLOW_SURVEY_DELAY`]
    pub fn pipeline_config_with_slow_survey(&self) -> PipelineConfig {
        PipelineConfig {
            skyview_url: self.url("/slow-skyview"),
            ..self.pipeline_config()
        }
    }

    /// Requests of any kind served so far
    pub fn total_hits(&self) -> usize {
        self.counters.total.load(Ordering::SeqCst)
    }

    pub fn sesame_hits(&self) -> usize {
        self.counters.sesame.load(Ordering::SeqCst)
    }

    pub fn skyview_hits(&self) -> usize {
        self.counters.skyview.load(Ordering::SeqCst)
    }
}
