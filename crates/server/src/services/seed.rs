use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    config::SeedConfig,
    db::{
        self,
        models::{Category, Role, Status},
        Database,
    },
    routes::auth::hash_password,
};

struct SampleReport {
    title: &'static str,
    description: &'static str,
    category: Category,
    status: Status,
    lat: f64,
    lng: f64,
    address: &'static str,
}

const SAMPLE_REPORTS: &[SampleReport] = &[
    SampleReport {
        title: "Pothole at Main Street crossing",
        description: "A deep pothole in the right lane near the crossing with 5th Avenue is damaging tyres.",
        category: Category::Roads,
        status: Status::New,
        lat: 40.7589,
        lng: -73.9851,
        address: "Main St & 5th Ave, New York, NY",
    },
    SampleReport {
        title: "Bins overflowing by the park entrance",
        description: "The bins at the south entrance have not been emptied for days and are attracting rats.",
        category: Category::Waste,
        status: Status::InProgress,
        lat: 40.7694,
        lng: -73.9787,
        address: "Central Park South, New York, NY",
    },
    SampleReport {
        title: "Street light out on Elm Street",
        description: "The lamp outside number 123 has been dark for three weeks and the block is pitch black at night.",
        category: Category::Lighting,
        status: Status::New,
        lat: 40.7580,
        lng: -73.9900,
        address: "123 Elm Street, New York, NY",
    },
    SampleReport {
        title: "Intersection needs a traffic signal",
        description: "Cars regularly run the junction at speed and there have been several near misses with pedestrians.",
        category: Category::Safety,
        status: Status::New,
        lat: 40.7614,
        lng: -73.9776,
        address: "Park Ave & 52nd St, New York, NY",
    },
    SampleReport {
        title: "Graffiti on the community centre",
        description: "Offensive graffiti has been sprayed across the east wall of the community centre.",
        category: Category::Other,
        status: Status::Resolved,
        lat: 40.7550,
        lng: -73.9820,
        address: "456 Community Ave, New York, NY",
    },
    SampleReport {
        title: "Cracked pavement on Oak Street",
        description: "Raised slabs along Oak Street are a trip hazard, especially for wheelchair users.",
        category: Category::Roads,
        status: Status::InProgress,
        lat: 40.7600,
        lng: -73.9875,
        address: "Oak Street, New York, NY",
    },
    SampleReport {
        title: "Construction rubble dumped in vacant lot",
        description: "Someone has dumped broken tiles and plasterboard in the empty lot on Pine Street.",
        category: Category::Waste,
        status: Status::New,
        lat: 40.7565,
        lng: -73.9810,
        address: "Pine Street vacant lot, New York, NY",
    },
    SampleReport {
        title: "Flickering lamp post near the school",
        description: "The lamp post by the school gate flickers all night and distracts drivers.",
        category: Category::Lighting,
        status: Status::Resolved,
        lat: 40.7620,
        lng: -73.9830,
        address: "School Lane, New York, NY",
    },
    SampleReport {
        title: "Missing manhole cover",
        description: "An open manhole on Broadway has only a traffic cone next to it.",
        category: Category::Safety,
        status: Status::InProgress,
        lat: 40.7575,
        lng: -73.9860,
        address: "Broadway & 47th St, New York, NY",
    },
    SampleReport {
        title: "Fallen tree blocking the cycle path",
        description: "A tree came down in last night's storm and now blocks the riverside cycle path.",
        category: Category::Other,
        status: Status::New,
        lat: 40.7700,
        lng: -73.9920,
        address: "Riverside cycle path, New York, NY",
    },
];

const SAMPLE_COMMENTS: &[&str] = &[
    "This needs fixing before someone gets hurt.",
    "I reported the same thing last month.",
    "Has anyone from the city replied yet?",
    "I pass here every day on my way to work.",
    "Thanks for flagging this!",
];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub reports: usize,
    pub comments: usize,
    pub upvotes: usize,
}

async fn ensure_user(database: &Database, email: &str, password: &str, role: Role) -> anyhow::Result<String> {
    let password_hash = hash_password(password)?;

    sqlx::query(
        "INSERT INTO users (id, email, password_hash, role, is_banned, created_at) VALUES (?, ?, ?, ?, 0, ?) ON CONFLICT(email) DO NOTHING",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(email)
    .bind(&password_hash)
    .bind(role)
    .bind(db::now())
    .execute(&database.pool)
    .await?;

    let id = sqlx::query_scalar::<_, String>("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(&database.pool)
        .await?;
    Ok(id)
}

/// Creates the seed accounts (idempotent) and, on an empty database, sample
/// reports with comments and upvotes.
pub async fn seed(database: &Database, config: &SeedConfig) -> anyhow::Result<SeedSummary> {
    let admin_id = ensure_user(database, &config.admin_email, &config.admin_password, Role::Admin).await?;
    let citizen_id = ensure_user(
        database,
        &config.citizen_email,
        &config.citizen_password,
        Role::Citizen,
    )
    .await?;
    tracing::info!(admin = %config.admin_email, citizen = %config.citizen_email, "seed accounts ready");

    let mut summary = SeedSummary {
        users: 2,
        ..Default::default()
    };

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reports")
        .fetch_one(&database.pool)
        .await?;
    if existing > 0 {
        tracing::info!(existing, "reports already present, skipping sample data");
        return Ok(summary);
    }

    let mut tx = database.pool.begin().await?;
    let now = Utc::now();

    for (i, sample) in SAMPLE_REPORTS.iter().enumerate() {
        let report_id = Uuid::new_v4().to_string();
        let created = now - Duration::days((SAMPLE_REPORTS.len() - i) as i64);
        let updated = match sample.status {
            Status::New => created,
            Status::InProgress | Status::Resolved => created + Duration::hours(6 * (i as i64 + 1)),
        };
        // Rotate ownership: citizen, admin, anonymous
        let owner = match i % 3 {
            0 => Some(&citizen_id),
            1 => Some(&admin_id),
            _ => None,
        };

        sqlx::query(
            r#"
            INSERT INTO reports (id, title, description, category, status, lat, lng, address,
                                 upvotes, anonymous, is_archived, created_at, updated_at, user_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(&report_id)
        .bind(sample.title)
        .bind(sample.description)
        .bind(sample.category)
        .bind(sample.status)
        .bind(sample.lat)
        .bind(sample.lng)
        .bind(sample.address)
        .bind(owner.is_none())
        .bind(db::timestamp(created))
        .bind(db::timestamp(updated))
        .bind(owner)
        .execute(&mut *tx)
        .await?;
        summary.reports += 1;

        if let Some(text) = SAMPLE_COMMENTS.get(i) {
            let author = if i % 2 == 0 { &citizen_id } else { &admin_id };
            sqlx::query(
                "INSERT INTO comments (id, text, created_at, report_id, user_id) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(*text)
            .bind(db::timestamp(created + Duration::hours(1)))
            .bind(&report_id)
            .bind(author)
            .execute(&mut *tx)
            .await?;
            summary.comments += 1;
        }

        // Keep the counter equal to the upvote rows
        let voters: Vec<&String> = match i % 4 {
            0 => vec![&citizen_id, &admin_id],
            1 | 2 => vec![&citizen_id],
            _ => Vec::new(),
        };
        for voter in &voters {
            sqlx::query(
                "INSERT INTO upvotes (id, created_at, report_id, user_id) VALUES (?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(db::timestamp(created))
            .bind(&report_id)
            .bind(*voter)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query("UPDATE reports SET upvotes = ? WHERE id = ?")
            .bind(voters.len() as i64)
            .bind(&report_id)
            .execute(&mut *tx)
            .await?;
        summary.upvotes += voters.len();
    }

    tx.commit().await?;
    tracing::info!(?summary, "sample data inserted");
    Ok(summary)
}

/// Removes every row, then seeds again.
pub async fn reset(database: &Database, config: &SeedConfig) -> anyhow::Result<SeedSummary> {
    let mut tx = database.pool.begin().await?;
    for table in ["upvotes", "comments", "reports", "users"] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    tracing::info!("all data deleted");

    seed(database, config).await
}
