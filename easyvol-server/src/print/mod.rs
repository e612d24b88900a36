//! Print pipeline: stored template + registry data -> HTML -> PDF

pub mod engine;

pub use engine::{MockPdfEngine, PdfEngine, PdfError, PdfOptions, WkhtmltopdfEngine};

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use easyvol_core::{template, Module};

use crate::db::repos::{
    DbError, JuniorMemberRepo, Meeting, MeetingRepo, Member, PrintTemplate, Radio, SchedulerItem,
    TrainingCourse, Vehicle, WarehouseItem,
};
use crate::http::error::ApiError;
use crate::models::{TemplateKind, ValidationError};
use crate::state::AppState;

/// Query parameters accepted by the generation endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrintParams {
    pub record_id: Option<Uuid>,
    /// Comma-separated UUID list for list templates
    pub record_ids: Option<String>,
    pub member_status: Option<String>,
    pub status: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// The module whose View grant guards printing this entity type. The
/// cadet registry prints under the member grant.
pub fn permission_module(entity_type: &str) -> Result<Module, ValidationError> {
    if entity_type == "junior_members" {
        return Ok(Module::Members);
    }
    entity_type
        .parse::<Module>()
        .map_err(|_| ValidationError::InvalidVariant {
            field: "entity type",
            value: entity_type.to_owned(),
        })
}

/// Lowercased filename slug: runs of non-alphanumerics collapse to `-`.
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("stampa");
    }
    out
}

/// Render a template against its data and convert the HTML to PDF.
///
/// The caller resolves the template (and checks the permission) first.
/// Returns the PDF bytes and the suggested filename.
pub async fn generate(
    state: &AppState,
    tmpl: &PrintTemplate,
    params: &PrintParams,
) -> Result<(Vec<u8>, String), ApiError> {
    let kind: TemplateKind = tmpl.template_kind.parse()?;

    let context = match kind {
        TemplateKind::Single => {
            let record_id = params.record_id.ok_or(ApiError::Validation(
                ValidationError::Empty { field: "record_id" },
            ))?;
            load_single(&state.pool, &tmpl.entity_type, record_id).await?
        }
        TemplateKind::List => {
            let items = load_list(&state.pool, &tmpl.entity_type, params).await?;
            let count = items_len(&items);
            json!({
                "items": items,
                "count": count,
                "generated_on": Utc::now().format("%Y-%m-%d").to_string(),
            })
        }
    };

    let html = template::render(&tmpl.html_content, &context);
    let options = PdfOptions {
        paper_size: tmpl.paper_size.clone(),
        orientation: tmpl.orientation.clone(),
    };

    let pdf = match state.pdf_engine.html_to_pdf(&html, &options).await {
        Ok(bytes) => bytes,
        Err(PdfError::Timeout { seconds }) => return Err(ApiError::Timeout { seconds }),
        Err(e) => {
            return Err(ApiError::Internal {
                message: format!("PDF generation failed: {}", e),
            })
        }
    };

    let filename = format!("{}_{}.pdf", slug(&tmpl.name), Utc::now().format("%Y%m%d"));
    Ok((pdf, filename))
}

fn items_len(items: &Value) -> usize {
    items.as_array().map(|a| a.len()).unwrap_or(0)
}

fn to_value<T: serde::Serialize>(record: &T) -> Result<Value, ApiError> {
    serde_json::to_value(record).map_err(|e| ApiError::Internal {
        message: format!("record serialization failed: {}", e),
    })
}

/// Load one record as the template context. Cadet records carry their
/// guardian list alongside, meeting records their participants.
async fn load_single(pool: &PgPool, entity_type: &str, id: Uuid) -> Result<Value, ApiError> {
    let value = match entity_type {
        "members" => {
            let member = fetch_one::<Member>(pool, "members", "member", id).await?;
            to_value(&member)?
        }
        "junior_members" => {
            let repo = JuniorMemberRepo::new(pool);
            let cadet = repo.get(id).await?;
            let guardians = repo.guardians(id).await?;
            let mut value = to_value(&cadet)?;
            if let Value::Object(map) = &mut value {
                map.insert("guardians".into(), to_value(&guardians)?);
            }
            value
        }
        "vehicles" => {
            let vehicle = fetch_one::<Vehicle>(pool, "vehicles", "vehicle", id).await?;
            to_value(&vehicle)?
        }
        "radios" => {
            let radio = fetch_one::<Radio>(pool, "radios", "radio", id).await?;
            to_value(&radio)?
        }
        "warehouse" => {
            let item =
                fetch_one::<WarehouseItem>(pool, "warehouse_items", "warehouse item", id).await?;
            to_value(&item)?
        }
        "meetings" => {
            let repo = MeetingRepo::new(pool);
            let meeting = repo.get(id).await?;
            let participants = repo.participants(id).await?;
            let mut value = to_value(&meeting)?;
            if let Value::Object(map) = &mut value {
                map.insert("participants".into(), to_value(&participants)?);
            }
            value
        }
        "training" => {
            let course =
                fetch_one::<TrainingCourse>(pool, "training_courses", "training course", id)
                    .await?;
            to_value(&course)?
        }
        "scheduler" => {
            let item =
                fetch_one::<SchedulerItem>(pool, "scheduler_items", "scheduler item", id).await?;
            to_value(&item)?
        }
        other => {
            return Err(ApiError::Validation(ValidationError::InvalidVariant {
                field: "entity type",
                value: other.to_owned(),
            }))
        }
    };
    Ok(value)
}

async fn fetch_one<T>(
    pool: &PgPool,
    table: &str,
    resource: &'static str,
    id: Uuid,
) -> Result<T, DbError>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    sqlx::query_as::<_, T>(&format!("SELECT * FROM {} WHERE id = $1", table))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::not_found(resource, id))
}

/// Load the rows backing a list template, either by explicit ids or by
/// filter. Member and cadet lists default to status `attivo`.
async fn load_list(
    pool: &PgPool,
    entity_type: &str,
    params: &PrintParams,
) -> Result<Value, ApiError> {
    if let Some(ids) = &params.record_ids {
        let mut items = Vec::new();
        for raw in ids.split(',') {
            let id = Uuid::parse_str(raw.trim()).map_err(|_| {
                ApiError::Validation(ValidationError::InvalidFormat {
                    field: "record_ids",
                    reason: "invalid UUID format",
                })
            })?;
            items.push(load_single(pool, entity_type, id).await?);
        }
        return Ok(Value::Array(items));
    }

    let value = match entity_type {
        "members" | "junior_members" => {
            let table = if entity_type == "members" {
                "members"
            } else {
                "junior_members"
            };
            let status = params
                .member_status
                .clone()
                .unwrap_or_else(|| "attivo".to_owned());
            let rows = sqlx::query_as::<_, Member>(&format!(
                "SELECT * FROM {} WHERE status = $1 ORDER BY last_name, first_name",
                table
            ))
            .bind(status)
            .fetch_all(pool)
            .await
            .map_err(DbError::from)?;
            to_value(&rows)?
        }
        "vehicles" => {
            let rows = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles ORDER BY code")
                .fetch_all(pool)
                .await
                .map_err(DbError::from)?;
            to_value(&rows)?
        }
        "radios" => {
            let rows = sqlx::query_as::<_, Radio>("SELECT * FROM radios ORDER BY code")
                .fetch_all(pool)
                .await
                .map_err(DbError::from)?;
            to_value(&rows)?
        }
        "warehouse" => {
            let rows =
                sqlx::query_as::<_, WarehouseItem>("SELECT * FROM warehouse_items ORDER BY name")
                    .fetch_all(pool)
                    .await
                    .map_err(DbError::from)?;
            to_value(&rows)?
        }
        "meetings" => {
            let from = params.date_from.unwrap_or(NaiveDate::MIN);
            let to = params.date_to.unwrap_or(NaiveDate::MAX);
            let rows = sqlx::query_as::<_, Meeting>(
                "SELECT * FROM meetings
                 WHERE meeting_date::date BETWEEN $1 AND $2
                 ORDER BY meeting_date DESC",
            )
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
            .map_err(DbError::from)?;
            to_value(&rows)?
        }
        "training" => {
            let rows = sqlx::query_as::<_, TrainingCourse>(
                "SELECT * FROM training_courses ORDER BY start_date DESC NULLS LAST",
            )
            .fetch_all(pool)
            .await
            .map_err(DbError::from)?;
            to_value(&rows)?
        }
        "scheduler" => {
            let rows = match &params.status {
                Some(status) => {
                    sqlx::query_as::<_, SchedulerItem>(
                        "SELECT * FROM scheduler_items WHERE status = $1 ORDER BY due_date",
                    )
                    .bind(status)
                    .fetch_all(pool)
                    .await
                }
                None => {
                    sqlx::query_as::<_, SchedulerItem>(
                        "SELECT * FROM scheduler_items ORDER BY due_date",
                    )
                    .fetch_all(pool)
                    .await
                }
            }
            .map_err(DbError::from)?;
            to_value(&rows)?
        }
        other => {
            return Err(ApiError::Validation(ValidationError::InvalidVariant {
                field: "entity type",
                value: other.to_owned(),
            }))
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadets_print_under_member_grant() {
        assert_eq!(permission_module("junior_members").unwrap(), Module::Members);
        assert_eq!(permission_module("vehicles").unwrap(), Module::Vehicles);
        assert!(permission_module("newsletter").is_err());
    }

    #[test]
    fn slug_flattens_punctuation() {
        assert_eq!(slug("Verbale Assemblea (2024)"), "verbale-assemblea-2024");
        assert_eq!(slug("Libretto Però"), "libretto-però");
        assert_eq!(slug("---"), "stampa");
    }
}
