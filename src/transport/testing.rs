use super::*;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Canned reply for a JSON call.
#[derive(Clone, Debug)]
pub enum CannedJson {
    Ok(serde_json::Value),
    Status { status: u16, body: serde_json::Value },
    Offline,
}

/// Scripted streamed reply. Chunks are replayed in order; an `Err` chunk ends
/// the stream like a dropped connection would.
pub struct ScriptedStream {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub chunks: Option<Vec<std::io::Result<Bytes>>>,
}

impl ScriptedStream {
    pub fn ok(chunks: Vec<std::io::Result<Bytes>>) -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), chunks: Some(chunks) }
    }

    pub fn error(status: u16, body: &str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            chunks: Some(vec![Ok(Bytes::copy_from_slice(body.as_bytes()))]),
        }
    }

    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.insert(name, value.parse().unwrap());
        self
    }

    pub fn without_body(mut self) -> Self {
        self.chunks = None;
        self
    }
}

/// Routes are keyed by `"METHOD path"`. JSON replies queue up; the last one
/// sticks so repeated fetches keep answering.
#[derive(Default)]
pub struct FakeTransport {
    json: Mutex<HashMap<String, VecDeque<CannedJson>>>,
    streams: Mutex<HashMap<String, VecDeque<ScriptedStream>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(method: &Method, path: &str) -> String {
        format!("{} {}", method, path)
    }

    pub fn with_json(self, method: Method, path: &str, reply: CannedJson) -> Self {
        self.json
            .lock()
            .unwrap()
            .entry(Self::key(&method, path))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn with_stream(self, path: &str, reply: ScriptedStream) -> Self {
        self.streams
            .lock()
            .unwrap()
            .entry(Self::key(&Method::GET, path))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, req: &ApiRequest) {
        self.requests.lock().unwrap().push(req.clone());
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn execute_json(&self, req: ApiRequest) -> ClientResult<serde_json::Value> {
        self.record(&req);
        let reply = {
            let mut routes = self.json.lock().unwrap();
            let queue = routes
                .get_mut(&Self::key(&req.method, &req.path))
                .ok_or_else(|| ClientError::Server { status: 404, message: format!("no route for {}", req.path) })?;
            if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            }
        };

        match reply {
            CannedJson::Ok(v) => Ok(v),
            CannedJson::Status { status, body } => Err(server_error(
                StatusCode::from_u16(status).unwrap(),
                &serde_json::to_vec(&body).unwrap(),
            )),
            CannedJson::Offline => Err(ClientError::network("connection refused")),
        }
    }

    async fn execute_stream(&self, req: ApiRequest) -> ClientResult<StreamedResponse> {
        self.record(&req);
        let scripted = self
            .streams
            .lock()
            .unwrap()
            .get_mut(&Self::key(&req.method, &req.path))
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| ClientError::network("connection refused"))?;

        let body = scripted.chunks.map(|chunks| {
            let stream: ByteStream = Box::pin(futures::stream::iter(chunks));
            stream
        });
        Ok(StreamedResponse { status: scripted.status, headers: scripted.headers, body })
    }
}
