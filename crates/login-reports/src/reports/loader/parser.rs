use super::{LoadError, ReportRequest};
use crate::reports::domain::ReportFormat;
use crate::reports::rows::ReportRow;
use serde::Deserialize;

/// JSON report files wrap their rows as `{ "results": [...], "start": .., "finish": .. }`.
#[derive(Debug, Deserialize)]
struct Envelope<R> {
    #[serde(default = "Vec::new")]
    results: Vec<R>,
}

pub(crate) fn parse_body<R: ReportRow>(
    request: &ReportRequest,
    body: &str,
) -> Result<Vec<R>, LoadError> {
    match R::KIND.format() {
        ReportFormat::Json => parse_json(request, body),
        ReportFormat::Csv => parse_csv(request, body),
    }
}

fn parse_json<R: ReportRow>(request: &ReportRequest, body: &str) -> Result<Vec<R>, LoadError> {
    let envelope: Envelope<R> =
        serde_json::from_str(body).map_err(|source| LoadError::Json {
            path: request.relative_path(),
            source,
        })?;
    Ok(envelope.results)
}

fn parse_csv<R: ReportRow>(request: &ReportRequest, body: &str) -> Result<Vec<R>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    reader
        .deserialize::<R>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| LoadError::Csv {
            path: request.relative_path(),
            source,
        })
}
