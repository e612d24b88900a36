//! CSV/XLSX export of the registries

pub mod sheet;

pub use sheet::{ExportError, Sheet};

use std::str::FromStr;

use chrono::Utc;
use sqlx::PgPool;

use easyvol_core::Module;

use crate::db::repos::DbError;
use crate::models::ValidationError;

/// Registries that can be exported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportEntity {
    Members,
    JuniorMembers,
    Vehicles,
    Radios,
    Warehouse,
    Events,
    Fees,
    Meetings,
    Training,
    Scheduler,
}

impl FromStr for ExportEntity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "members" => Ok(Self::Members),
            "junior_members" => Ok(Self::JuniorMembers),
            "vehicles" => Ok(Self::Vehicles),
            "radios" => Ok(Self::Radios),
            "warehouse" => Ok(Self::Warehouse),
            "events" => Ok(Self::Events),
            "fees" => Ok(Self::Fees),
            "meetings" => Ok(Self::Meetings),
            "training" => Ok(Self::Training),
            "scheduler" => Ok(Self::Scheduler),
            other => Err(ValidationError::InvalidVariant {
                field: "export entity",
                value: other.to_owned(),
            }),
        }
    }
}

impl ExportEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Members => "members",
            Self::JuniorMembers => "junior_members",
            Self::Vehicles => "vehicles",
            Self::Radios => "radios",
            Self::Warehouse => "warehouse",
            Self::Events => "events",
            Self::Fees => "fees",
            Self::Meetings => "meetings",
            Self::Training => "training",
            Self::Scheduler => "scheduler",
        }
    }

    /// The module whose Export grant guards this entity.
    pub fn module(&self) -> Module {
        match self {
            Self::Members => Module::Members,
            Self::JuniorMembers => Module::JuniorMembers,
            Self::Vehicles => Module::Vehicles,
            Self::Radios => Module::Radios,
            Self::Warehouse => Module::Warehouse,
            Self::Events => Module::Events,
            Self::Fees => Module::Fees,
            Self::Meetings => Module::Meetings,
            Self::Training => Module::Training,
            Self::Scheduler => Module::Scheduler,
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl FromStr for ExportFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(Self::Csv),
            // "excel" is accepted as an alias for the same output
            "xlsx" | "excel" => Ok(Self::Xlsx),
            other => Err(ValidationError::InvalidVariant {
                field: "export format",
                value: other.to_owned(),
            }),
        }
    }
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

/// `<entity>_<YYYYMMDD>.<ext>`
pub fn export_filename(entity: ExportEntity, format: ExportFormat) -> String {
    format!(
        "{}_{}.{}",
        entity.as_str(),
        Utc::now().format("%Y%m%d"),
        format.extension()
    )
}

fn opt(value: Option<String>) -> String {
    value.unwrap_or_default()
}

/// Build the full sheet for an entity.
pub async fn build_sheet(pool: &PgPool, entity: ExportEntity) -> Result<Sheet, DbError> {
    let sheet = match entity {
        ExportEntity::Members | ExportEntity::JuniorMembers => {
            let table = if entity == ExportEntity::Members {
                "members"
            } else {
                "junior_members"
            };
            let rows: Vec<(
                String,
                String,
                Option<String>,
                Option<String>,
                String,
                Option<String>,
                Option<String>,
            )> = sqlx::query_as(&format!(
                "SELECT last_name, first_name, tax_code, membership_number, status, email, phone
                 FROM {} ORDER BY last_name, first_name",
                table
            ))
            .fetch_all(pool)
            .await?;

            let mut sheet = Sheet::new(
                entity.as_str(),
                [
                    "last_name",
                    "first_name",
                    "tax_code",
                    "membership_number",
                    "status",
                    "email",
                    "phone",
                ]
                .map(String::from)
                .to_vec(),
            );
            for (last, first, tax, number, status, email, phone) in rows {
                sheet.push_row(vec![
                    last,
                    first,
                    opt(tax),
                    opt(number),
                    status,
                    opt(email),
                    opt(phone),
                ]);
            }
            sheet
        }
        ExportEntity::Vehicles => {
            let rows: Vec<(String, Option<String>, String, Option<String>, String)> =
                sqlx::query_as(
                    "SELECT code, plate, name, vehicle_type, status FROM vehicles ORDER BY code",
                )
                .fetch_all(pool)
                .await?;

            let mut sheet = Sheet::new(
                "vehicles",
                ["code", "plate", "name", "type", "status"]
                    .map(String::from)
                    .to_vec(),
            );
            for (code, plate, name, vehicle_type, status) in rows {
                sheet.push_row(vec![code, opt(plate), name, opt(vehicle_type), status]);
            }
            sheet
        }
        ExportEntity::Radios => {
            let rows: Vec<(String, Option<String>, Option<String>, String)> = sqlx::query_as(
                "SELECT code, serial, model, status FROM radios ORDER BY code",
            )
            .fetch_all(pool)
            .await?;

            let mut sheet = Sheet::new(
                "radios",
                ["code", "serial", "model", "status"].map(String::from).to_vec(),
            );
            for (code, serial, model, status) in rows {
                sheet.push_row(vec![code, opt(serial), opt(model), status]);
            }
            sheet
        }
        ExportEntity::Warehouse => {
            let rows: Vec<(String, String, Option<String>, i64, i64, Option<String>)> =
                sqlx::query_as(
                    "SELECT code, name, category, quantity, minimum_quantity, location
                     FROM warehouse_items ORDER BY name",
                )
                .fetch_all(pool)
                .await?;

            let mut sheet = Sheet::new(
                "warehouse",
                [
                    "code",
                    "name",
                    "category",
                    "quantity",
                    "minimum_quantity",
                    "location",
                ]
                .map(String::from)
                .to_vec(),
            );
            for (code, name, category, quantity, minimum, location) in rows {
                sheet.push_row(vec![
                    code,
                    name,
                    opt(category),
                    quantity.to_string(),
                    minimum.to_string(),
                    opt(location),
                ]);
            }
            sheet
        }
        ExportEntity::Events => {
            let rows: Vec<(
                String,
                String,
                chrono::DateTime<Utc>,
                Option<chrono::DateTime<Utc>>,
                Option<String>,
                String,
            )> = sqlx::query_as(
                "SELECT title, event_type, start_date, end_date, location, status
                 FROM events ORDER BY start_date DESC",
            )
            .fetch_all(pool)
            .await?;

            let mut sheet = Sheet::new(
                "events",
                ["title", "type", "start_date", "end_date", "location", "status"]
                    .map(String::from)
                    .to_vec(),
            );
            for (title, event_type, start, end, location, status) in rows {
                sheet.push_row(vec![
                    title,
                    event_type,
                    start.format("%Y-%m-%d %H:%M").to_string(),
                    end.map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default(),
                    opt(location),
                    status,
                ]);
            }
            sheet
        }
        ExportEntity::Fees => {
            let rows: Vec<(String, String, Option<String>, i32, chrono::NaiveDate, Option<f64>)> =
                sqlx::query_as(
                    "SELECT m.last_name, m.first_name, m.membership_number,
                            f.year, f.payment_date, f.amount
                     FROM member_fees f
                     JOIN members m ON m.id = f.member_id
                     ORDER BY f.year DESC, m.last_name, m.first_name",
                )
                .fetch_all(pool)
                .await?;

            let mut sheet = Sheet::new(
                "fees",
                [
                    "last_name",
                    "first_name",
                    "membership_number",
                    "year",
                    "payment_date",
                    "amount",
                ]
                .map(String::from)
                .to_vec(),
            );
            for (last, first, number, year, date, amount) in rows {
                sheet.push_row(vec![
                    last,
                    first,
                    opt(number),
                    year.to_string(),
                    date.to_string(),
                    amount.map(|a| format!("{:.2}", a)).unwrap_or_default(),
                ]);
            }
            sheet
        }
        ExportEntity::Meetings => {
            let rows: Vec<(String, Option<String>, chrono::DateTime<Utc>, Option<String>)> =
                sqlx::query_as(
                    "SELECT title, meeting_type, meeting_date, location
                     FROM meetings ORDER BY meeting_date DESC",
                )
                .fetch_all(pool)
                .await?;

            let mut sheet = Sheet::new(
                "meetings",
                ["title", "type", "date", "location"].map(String::from).to_vec(),
            );
            for (title, meeting_type, date, location) in rows {
                sheet.push_row(vec![
                    title,
                    opt(meeting_type),
                    date.format("%Y-%m-%d %H:%M").to_string(),
                    opt(location),
                ]);
            }
            sheet
        }
        ExportEntity::Training => {
            let rows: Vec<(
                String,
                Option<String>,
                Option<chrono::NaiveDate>,
                Option<chrono::NaiveDate>,
                Option<String>,
            )> = sqlx::query_as(
                "SELECT title, course_type, start_date, end_date, instructor
                 FROM training_courses ORDER BY start_date DESC NULLS LAST",
            )
            .fetch_all(pool)
            .await?;

            let mut sheet = Sheet::new(
                "training",
                ["title", "type", "start_date", "end_date", "instructor"]
                    .map(String::from)
                    .to_vec(),
            );
            for (title, course_type, start, end, instructor) in rows {
                sheet.push_row(vec![
                    title,
                    opt(course_type),
                    start.map(|d| d.to_string()).unwrap_or_default(),
                    end.map(|d| d.to_string()).unwrap_or_default(),
                    opt(instructor),
                ]);
            }
            sheet
        }
        ExportEntity::Scheduler => {
            let rows: Vec<(String, Option<String>, chrono::NaiveDate, String)> = sqlx::query_as(
                "SELECT title, category, due_date, status FROM scheduler_items ORDER BY due_date",
            )
            .fetch_all(pool)
            .await?;

            let mut sheet = Sheet::new(
                "scheduler",
                ["title", "category", "due_date", "status"]
                    .map(String::from)
                    .to_vec(),
            );
            for (title, category, due_date, status) in rows {
                sheet.push_row(vec![title, opt(category), due_date.to_string(), status]);
            }
            sheet
        }
    };

    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_parses_wire_names() {
        assert_eq!(
            "junior_members".parse::<ExportEntity>().unwrap(),
            ExportEntity::JuniorMembers
        );
        assert_eq!("events".parse::<ExportEntity>().unwrap(), ExportEntity::Events);
        assert_eq!("fees".parse::<ExportEntity>().unwrap(), ExportEntity::Fees);
        assert!("newsletter".parse::<ExportEntity>().is_err());
    }

    #[test]
    fn entity_maps_to_module() {
        assert_eq!(ExportEntity::Events.module(), Module::Events);
        assert_eq!(ExportEntity::Fees.module(), Module::Fees);
    }

    #[test]
    fn excel_is_an_alias_for_xlsx() {
        assert_eq!("excel".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert_eq!("xlsx".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn filename_carries_entity_and_date() {
        let name = export_filename(ExportEntity::Warehouse, ExportFormat::Csv);
        assert!(name.starts_with("warehouse_"));
        assert!(name.ends_with(".csv"));
    }
}
