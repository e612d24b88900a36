//! Schema migrations
//!
//! Idempotent `CREATE TABLE IF NOT EXISTS` statements executed at startup
//! (and via `easyvol migrate`). The permission catalog is seeded with every
//! known module/action pair; grants reference catalog rows.

use sqlx::PgPool;

use easyvol_core::{Action, Module};

use super::DbError;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS roles (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        password_salt TEXT NOT NULL,
        display_name TEXT NOT NULL,
        email TEXT,
        role_id UUID REFERENCES roles(id) ON DELETE SET NULL,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS permissions (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        module TEXT NOT NULL,
        action TEXT NOT NULL,
        UNIQUE (module, action)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS role_permissions (
        role_id UUID NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
        permission_id UUID NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
        PRIMARY KEY (role_id, permission_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_permissions (
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        permission_id UUID NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
        PRIMARY KEY (user_id, permission_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        token UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        expires_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS members (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        tax_code TEXT,
        membership_number TEXT,
        status TEXT NOT NULL DEFAULT 'attivo',
        email TEXT,
        phone TEXT,
        address TEXT,
        birth_date DATE,
        joined_on DATE,
        resigned_on DATE,
        photo_path TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS member_attachments (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        member_id UUID NOT NULL REFERENCES members(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        file_path TEXT NOT NULL,
        uploaded_by UUID REFERENCES users(id) ON DELETE SET NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS junior_members (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        tax_code TEXT,
        membership_number TEXT,
        status TEXT NOT NULL DEFAULT 'attivo',
        email TEXT,
        phone TEXT,
        address TEXT,
        birth_date DATE,
        joined_on DATE,
        resigned_on DATE,
        photo_path TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS junior_member_guardians (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        junior_member_id UUID NOT NULL REFERENCES junior_members(id) ON DELETE CASCADE,
        guardian_type TEXT NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        phone TEXT,
        email TEXT,
        tax_code TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS junior_member_attachments (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        junior_member_id UUID NOT NULL REFERENCES junior_members(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        file_path TEXT NOT NULL,
        uploaded_by UUID REFERENCES users(id) ON DELETE SET NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vehicles (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        code TEXT NOT NULL UNIQUE,
        plate TEXT,
        name TEXT NOT NULL,
        vehicle_type TEXT,
        status TEXT NOT NULL DEFAULT 'operativo',
        photo_path TEXT,
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vehicle_documents (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        vehicle_id UUID NOT NULL REFERENCES vehicles(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        file_path TEXT NOT NULL,
        expires_on DATE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS radios (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        code TEXT NOT NULL UNIQUE,
        serial TEXT,
        model TEXT,
        status TEXT NOT NULL DEFAULT 'disponibile',
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS radio_assignments (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        radio_id UUID NOT NULL REFERENCES radios(id) ON DELETE CASCADE,
        member_id UUID NOT NULL REFERENCES members(id) ON DELETE CASCADE,
        assigned_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        returned_at TIMESTAMPTZ,
        notes TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS warehouse_items (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        category TEXT,
        quantity BIGINT NOT NULL DEFAULT 0,
        minimum_quantity BIGINT NOT NULL DEFAULT 0,
        unit TEXT,
        location TEXT,
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS warehouse_movements (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        item_id UUID NOT NULL REFERENCES warehouse_items(id) ON DELETE RESTRICT,
        movement_type TEXT NOT NULL,
        quantity BIGINT NOT NULL,
        member_id UUID REFERENCES members(id) ON DELETE SET NULL,
        destination TEXT,
        notes TEXT,
        created_by UUID REFERENCES users(id) ON DELETE SET NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS meetings (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        title TEXT NOT NULL,
        meeting_type TEXT,
        meeting_date TIMESTAMPTZ NOT NULL,
        location TEXT,
        agenda TEXT,
        minutes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS meeting_participants (
        meeting_id UUID NOT NULL REFERENCES meetings(id) ON DELETE CASCADE,
        member_id UUID NOT NULL REFERENCES members(id) ON DELETE CASCADE,
        role TEXT,
        attendance TEXT NOT NULL DEFAULT 'assente',
        PRIMARY KEY (meeting_id, member_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS meeting_attachments (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        meeting_id UUID NOT NULL REFERENCES meetings(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        file_path TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS training_courses (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        title TEXT NOT NULL,
        course_type TEXT,
        start_date DATE,
        end_date DATE,
        location TEXT,
        instructor TEXT,
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS training_attendance (
        course_id UUID NOT NULL REFERENCES training_courses(id) ON DELETE CASCADE,
        member_id UUID NOT NULL REFERENCES members(id) ON DELETE CASCADE,
        status TEXT NOT NULL DEFAULT 'iscritto',
        hours DOUBLE PRECISION NOT NULL DEFAULT 0,
        PRIMARY KEY (course_id, member_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS scheduler_items (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        title TEXT NOT NULL,
        description TEXT,
        category TEXT,
        due_date DATE NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        assigned_to UUID REFERENCES users(id) ON DELETE SET NULL,
        reminder_days INT NOT NULL DEFAULT 7,
        completed_at TIMESTAMPTZ,
        completed_by UUID REFERENCES users(id) ON DELETE SET NULL,
        created_by UUID REFERENCES users(id) ON DELETE SET NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        event_type TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT,
        start_date TIMESTAMPTZ NOT NULL,
        end_date TIMESTAMPTZ,
        location TEXT,
        status TEXT NOT NULL DEFAULT 'aperto',
        created_by UUID REFERENCES users(id) ON DELETE SET NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS event_participants (
        event_id UUID NOT NULL REFERENCES events(id) ON DELETE CASCADE,
        member_id UUID NOT NULL REFERENCES members(id) ON DELETE CASCADE,
        role TEXT,
        hours DOUBLE PRECISION NOT NULL DEFAULT 0,
        PRIMARY KEY (event_id, member_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS event_vehicles (
        event_id UUID NOT NULL REFERENCES events(id) ON DELETE CASCADE,
        vehicle_id UUID NOT NULL REFERENCES vehicles(id) ON DELETE CASCADE,
        notes TEXT,
        PRIMARY KEY (event_id, vehicle_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS fee_payment_requests (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        membership_number TEXT NOT NULL,
        last_name TEXT NOT NULL,
        payment_year INT NOT NULL,
        payment_date DATE NOT NULL,
        amount DOUBLE PRECISION,
        receipt_path TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        submitted_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        processed_at TIMESTAMPTZ,
        processed_by UUID REFERENCES users(id) ON DELETE SET NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS member_fees (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        member_id UUID NOT NULL REFERENCES members(id) ON DELETE CASCADE,
        year INT NOT NULL,
        payment_date DATE NOT NULL,
        amount DOUBLE PRECISION,
        receipt_path TEXT,
        verified_by UUID REFERENCES users(id) ON DELETE SET NULL,
        verified_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        title TEXT NOT NULL,
        category TEXT,
        file_path TEXT NOT NULL,
        uploaded_by UUID REFERENCES users(id) ON DELETE SET NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS print_templates (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        entity_type TEXT NOT NULL,
        template_kind TEXT NOT NULL DEFAULT 'single',
        html_content TEXT NOT NULL,
        paper_size TEXT NOT NULL DEFAULT 'A4',
        orientation TEXT NOT NULL DEFAULT 'portrait',
        created_by UUID REFERENCES users(id) ON DELETE SET NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS activity_log (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id UUID REFERENCES users(id) ON DELETE SET NULL,
        module TEXT NOT NULL,
        action TEXT NOT NULL,
        record_id UUID,
        description TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at)",
    "CREATE INDEX IF NOT EXISTS idx_members_status ON members(status)",
    "CREATE INDEX IF NOT EXISTS idx_members_last_name ON members(last_name)",
    "CREATE INDEX IF NOT EXISTS idx_junior_members_status ON junior_members(status)",
    "CREATE INDEX IF NOT EXISTS idx_guardians_junior ON junior_member_guardians(junior_member_id)",
    "CREATE INDEX IF NOT EXISTS idx_vehicle_documents_vehicle ON vehicle_documents(vehicle_id)",
    "CREATE INDEX IF NOT EXISTS idx_radio_assignments_radio ON radio_assignments(radio_id)",
    "CREATE INDEX IF NOT EXISTS idx_radio_assignments_open ON radio_assignments(radio_id) WHERE returned_at IS NULL",
    "CREATE INDEX IF NOT EXISTS idx_warehouse_movements_item ON warehouse_movements(item_id)",
    "CREATE INDEX IF NOT EXISTS idx_meeting_participants_meeting ON meeting_participants(meeting_id)",
    "CREATE INDEX IF NOT EXISTS idx_events_status ON events(status)",
    "CREATE INDEX IF NOT EXISTS idx_events_start ON events(start_date DESC)",
    "CREATE INDEX IF NOT EXISTS idx_fee_requests_status ON fee_payment_requests(status)",
    "CREATE INDEX IF NOT EXISTS idx_member_fees_member ON member_fees(member_id, year)",
    "CREATE INDEX IF NOT EXISTS idx_scheduler_due ON scheduler_items(due_date)",
    "CREATE INDEX IF NOT EXISTS idx_scheduler_status ON scheduler_items(status)",
    "CREATE INDEX IF NOT EXISTS idx_activity_log_module ON activity_log(module, created_at DESC)",
];

/// Run all migrations.
pub async fn run(pool: &PgPool) -> Result<(), DbError> {
    tracing::info!("Running migrations...");

    for statement in TABLES {
        sqlx::query(statement).execute(pool).await?;
    }
    for statement in INDEXES {
        sqlx::query(statement).execute(pool).await?;
    }
    seed_permission_catalog(pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}

/// Ensure every module/action pair exists in the permission catalog.
async fn seed_permission_catalog(pool: &PgPool) -> Result<(), DbError> {
    for module in Module::ALL {
        for action in Action::ALL {
            sqlx::query(
                "INSERT INTO permissions (module, action) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(module.as_str())
            .bind(action.as_str())
            .execute(pool)
            .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn migrations_are_idempotent() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool");
        run(&pool).await.expect("first run");
        run(&pool).await.expect("second run");
    }
}
