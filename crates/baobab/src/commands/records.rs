//! Record fetch and search handlers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use baobab_core::{Coordinate, Record, RecordKind, Sdk};

use crate::cli::{BaselineArgs, FetchArgs, GlobalOpts, LoginsArgs, SearchArgs, ThingsArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Views ───────────────────────────────────────────────────────────

/// Serializable summary of a cached record.
#[derive(Debug, Serialize)]
pub struct RecordView {
    pub id: i64,
    pub kind: RecordKind,
    pub name: String,
    pub lang: String,
    pub writeable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_access: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_token: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_token: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_tokens: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fuzzy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RecordView {
    fn new(sdk: &Sdk, record: &Record) -> Self {
        let coords = record.data().and_then(|d| d.coords());
        Self {
            id: record.id(),
            kind: record.kind(),
            name: record.name().to_owned(),
            lang: record.lang().to_owned(),
            writeable: record.is_writeable(),
            last_access: record.last_access(),
            read_token: record.read_token(),
            write_token: record.write_token(),
            login_id: record
                .security()
                .and_then(|s| s.login_id())
                .map(str::to_owned),
            security_tokens: record.security().map(|s| s.security_tokens()),
            latitude: coords.map(|c| c.latitude),
            longitude: coords.map(|c| c.longitude),
            fuzzy: record.data().is_some_and(|d| d.is_fuzzy()),
            distance_km: sdk.distance(&record.key()),
            key: record.thing().and_then(|t| t.key.clone()),
            description: record.thing().and_then(|t| t.description.clone()),
        }
    }
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Lang")]
    lang: String,
    #[tabled(rename = "W")]
    writeable: &'static str,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl RecordRow {
    fn of(v: &RecordView) -> Self {
        let detail = if let Some(ref login_id) = v.login_id {
            login_id.clone()
        } else if let Some(ref key) = v.key {
            key.clone()
        } else if let Some(distance) = v.distance_km {
            format!("{distance:.2} km")
        } else if let (Some(lat), Some(lng)) = (v.latitude, v.longitude) {
            let marker = if v.fuzzy { " ~" } else { "" };
            format!("{lat:.5}, {lng:.5}{marker}")
        } else {
            "-".into()
        };
        Self {
            id: v.id,
            kind: v.kind.to_string(),
            name: v.name.clone(),
            lang: v.lang.clone(),
            writeable: if v.writeable { "yes" } else { "no" },
            detail,
        }
    }
}

fn print_records(sdk: &Sdk, records: &[Record], global: &GlobalOpts) -> Result<(), CliError> {
    let views: Vec<RecordView> = records.iter().map(|r| RecordView::new(sdk, r)).collect();
    let out = output::render_list(&global.output, &views, RecordRow::of, |v| {
        v.id.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn ensure_found(records: &[Record], resource_type: &str, identifier: String) -> Result<(), CliError> {
    if records.is_empty() {
        return Err(CliError::NotFound {
            resource_type: resource_type.into(),
            identifier,
        });
    }
    Ok(())
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn fetch(sdk: &Sdk, args: FetchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::require_login(sdk, global)?;
    let records = util::collect_records(sdk, |sdk| sdk.fetch_records(args.kind, &args.ids)).await?;
    ensure_found(&records, &args.kind.to_string(), join(&args.ids))?;
    print_records(sdk, &records, global)
}

pub async fn things(sdk: &Sdk, args: ThingsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::require_login(sdk, global)?;
    let records = util::collect_records(sdk, |sdk| sdk.fetch_things_by_key(&args.keys)).await?;
    ensure_found(&records, "thing", join(&args.keys))?;
    print_records(sdk, &records, global)
}

pub async fn logins(sdk: &Sdk, args: LoginsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::require_login(sdk, global)?;

    let mut records = Vec::new();
    if !args.ids.is_empty() {
        records.extend(
            util::collect_records(sdk, |sdk| sdk.fetch_security_records(&args.ids)).await?,
        );
    }
    if !args.names.is_empty() {
        let by_name = util::collect_records(sdk, |sdk| {
            sdk.fetch_security_records_by_login_id(&args.names)
        })
        .await?;
        for record in by_name {
            if !records.iter().any(|r: &Record| r.key() == record.key()) {
                records.push(record);
            }
        }
    }
    records.sort_by_key(Record::key);
    print_records(sdk, &records, global)
}

pub async fn baseline(sdk: &Sdk, args: BaselineArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::require_login(sdk, global)?;
    let records =
        util::collect_records(sdk, |sdk| sdk.fetch_baseline_records(&args.ids)).await?;
    ensure_found(&records, "record", join(&args.ids))?;
    print_records(sdk, &records, global)
}

pub async fn search(sdk: &Sdk, args: SearchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::require_login(sdk, global)?;
    let center = Coordinate::new(args.lat, args.lng);
    sdk.set_search_center(Some(center));
    let mut records = util::collect_records(sdk, |sdk| {
        sdk.search_by_location(args.kind, center, args.radius)
    })
    .await?;

    records.sort_by(|a, b| {
        let da = sdk.distance(&a.key()).unwrap_or(f64::INFINITY);
        let db = sdk.distance(&b.key()).unwrap_or(f64::INFINITY);
        da.total_cmp(&db)
    });
    if records.is_empty() && !global.quiet {
        eprintln!("No {} within {} km", args.kind, args.radius);
    }
    print_records(sdk, &records, global)
}
