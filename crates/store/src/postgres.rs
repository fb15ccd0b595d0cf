use async_trait::async_trait;
use common::{
    AssignmentId, IncidentId, InventoryId, ProductId, SellerId, ShopkeeperId, UserId, VisitId,
    ZoneId,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::{
    Assignment, AssignmentQuery, IncidentQuery, InventoryItem, InventoryQuery, NewAssignment,
    NewIncident, NewInventoryItem, NewSeller, NewShopkeeper, NewVisit, Result, Seller,
    SellerIncident, SellerQuery, Shopkeeper, ShopkeeperQuery, StoreError, Unassignment, Visit,
    VisitCounts, VisitQuery, store::UserStore,
};

const SELLER_COLUMNS: &str =
    "id, name, email, phone, address, zone_id, user_id, is_active, created_at, updated_at";

const SHOPKEEPER_COLUMNS: &str = "s.id, s.name, s.business_name, s.address, s.phone, s.email, \
     s.latitude, s.longitude, s.is_active, s.created_at, s.updated_at";

const ASSIGNMENT_COLUMNS: &str = "id, seller_id, shopkeeper_id, assigned_at, unassigned_at, \
     assigned_by, unassigned_by, notes, is_active, created_at, updated_at";

const VISIT_COLUMNS: &str = "id, seller_id, shopkeeper_id, scheduled_date, status, reason, notes, \
     completed_at, cancelled_at, cancelled_reason, created_at, updated_at";

const INCIDENT_COLUMNS: &str = "id, seller_id, shopkeeper_id, visit_id, type, description, \
     incident_date, created_at, updated_at";

const INVENTORY_COLUMNS: &str = "id, shopkeeper_id, product_id, unit_price, current_stock, \
     min_stock, max_stock, product_name, product_description, product_category, product_brand, \
     is_validated, validated_by, validated_at, is_active, last_updated, created_at, updated_at";

/// PostgreSQL-backed user store implementation.
#[derive(Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    /// Creates a new PostgreSQL user store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool against `database_url`.
    #[tracing::instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "failed to open database pool"))?;
        tracing::info!("database pool opened");
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    #[tracing::instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<()> {
        let migrator = sqlx::migrate!("../../migrations");
        migrator.run(&self.pool).await?;
        tracing::info!(count = migrator.iter().count(), "migrations applied");
        Ok(())
    }

    fn row_to_seller(row: PgRow) -> Result<Seller> {
        Ok(Seller {
            id: SellerId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            zone_id: ZoneId::new(row.try_get("zone_id")?),
            user_id: row.try_get::<Option<i64>, _>("user_id")?.map(UserId::new),
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_shopkeeper(row: PgRow) -> Result<Shopkeeper> {
        Ok(Shopkeeper {
            id: ShopkeeperId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            business_name: row.try_get("business_name")?,
            address: row.try_get("address")?,
            phone: row.try_get("phone")?,
            email: row.try_get("email")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_assignment(row: PgRow) -> Result<Assignment> {
        Ok(Assignment {
            id: AssignmentId::new(row.try_get("id")?),
            seller_id: SellerId::new(row.try_get("seller_id")?),
            shopkeeper_id: ShopkeeperId::new(row.try_get("shopkeeper_id")?),
            assigned_at: row.try_get("assigned_at")?,
            unassigned_at: row.try_get("unassigned_at")?,
            assigned_by: row.try_get::<Option<i64>, _>("assigned_by")?.map(UserId::new),
            unassigned_by: row
                .try_get::<Option<i64>, _>("unassigned_by")?
                .map(UserId::new),
            notes: row.try_get("notes")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_visit(row: PgRow) -> Result<Visit> {
        let status: String = row.try_get("status")?;
        Ok(Visit {
            id: VisitId::new(row.try_get("id")?),
            seller_id: SellerId::new(row.try_get("seller_id")?),
            shopkeeper_id: ShopkeeperId::new(row.try_get("shopkeeper_id")?),
            scheduled_date: row.try_get("scheduled_date")?,
            status: status
                .parse()
                .map_err(|e: common::ParseLabelError| StoreError::Corrupt(e.to_string()))?,
            reason: row.try_get("reason")?,
            notes: row.try_get("notes")?,
            completed_at: row.try_get("completed_at")?,
            cancelled_at: row.try_get("cancelled_at")?,
            cancelled_reason: row.try_get("cancelled_reason")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_incident(row: PgRow) -> Result<SellerIncident> {
        let kind: String = row.try_get("type")?;
        Ok(SellerIncident {
            id: IncidentId::new(row.try_get("id")?),
            seller_id: SellerId::new(row.try_get("seller_id")?),
            shopkeeper_id: row
                .try_get::<Option<i64>, _>("shopkeeper_id")?
                .map(ShopkeeperId::new),
            visit_id: row.try_get::<Option<i64>, _>("visit_id")?.map(VisitId::new),
            kind: kind
                .parse()
                .map_err(|e: common::ParseLabelError| StoreError::Corrupt(e.to_string()))?,
            description: row.try_get("description")?,
            incident_date: row.try_get("incident_date")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_inventory_item(row: PgRow) -> Result<InventoryItem> {
        Ok(InventoryItem {
            id: InventoryId::new(row.try_get("id")?),
            shopkeeper_id: ShopkeeperId::new(row.try_get("shopkeeper_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            unit_price: row.try_get("unit_price")?,
            current_stock: row.try_get("current_stock")?,
            min_stock: row.try_get("min_stock")?,
            max_stock: row.try_get("max_stock")?,
            product_name: row.try_get("product_name")?,
            product_description: row.try_get("product_description")?,
            product_category: row.try_get("product_category")?,
            product_brand: row.try_get("product_brand")?,
            is_validated: row.try_get("is_validated")?,
            validated_by: row
                .try_get::<Option<i64>, _>("validated_by")?
                .map(UserId::new),
            validated_at: row.try_get("validated_at")?,
            is_active: row.try_get("is_active")?,
            last_updated: row.try_get("last_updated")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn push_visit_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &VisitQuery) {
        builder.push(" WHERE 1=1");
        if let Some(seller_id) = query.seller_id {
            builder.push(" AND seller_id = ").push_bind(seller_id.get());
        }
        if let Some(shopkeeper_id) = query.shopkeeper_id {
            builder
                .push(" AND shopkeeper_id = ")
                .push_bind(shopkeeper_id.get());
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(from) = query.from {
            builder.push(" AND scheduled_date >= ").push_bind(from);
        }
        if let Some(to) = query.to {
            builder.push(" AND scheduled_date <= ").push_bind(to);
        }
    }
}

/// Maps a unique-constraint violation to `StoreError::UniqueViolation`.
fn unique_violation(
    err: sqlx::Error,
    entity: &'static str,
    field: &'static str,
    value: impl Into<String>,
) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return StoreError::UniqueViolation {
            entity,
            field,
            value: value.into(),
        };
    }
    StoreError::Database(err)
}

async fn insert_assignment_in<'e, E>(executor: E, new: &NewAssignment) -> Result<Assignment>
where
    E: sqlx::PgExecutor<'e>,
{
    let row = sqlx::query(&format!(
        "INSERT INTO assignments (seller_id, shopkeeper_id, assigned_by, notes) \
         VALUES ($1, $2, $3, $4) RETURNING {ASSIGNMENT_COLUMNS}"
    ))
    .bind(new.seller_id.get())
    .bind(new.shopkeeper_id.get())
    .bind(new.assigned_by.map(|u| u.get()))
    .bind(&new.notes)
    .fetch_one(executor)
    .await
    .map_err(|e| unique_violation(e, "assignment", "shopkeeper_id", new.shopkeeper_id.to_string()))?;

    PostgresUserStore::row_to_assignment(row)
}

async fn end_assignment_in<'e, E>(
    executor: E,
    id: AssignmentId,
    end: Unassignment,
) -> Result<Assignment>
where
    E: sqlx::PgExecutor<'e>,
{
    // An already inactive row keeps its first closing data.
    let row = sqlx::query(&format!(
        "UPDATE assignments SET \
             unassigned_at = CASE WHEN is_active THEN $2 ELSE unassigned_at END, \
             unassigned_by = CASE WHEN is_active THEN $3 ELSE unassigned_by END, \
             updated_at = CASE WHEN is_active THEN $2 ELSE updated_at END, \
             is_active = FALSE \
         WHERE id = $1 RETURNING {ASSIGNMENT_COLUMNS}"
    ))
    .bind(id.get())
    .bind(end.at)
    .bind(end.unassigned_by.map(|u| u.get()))
    .fetch_optional(executor)
    .await?;

    match row {
        Some(row) => PostgresUserStore::row_to_assignment(row),
        None => Err(StoreError::not_found("assignment", id)),
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_seller(&self, new: NewSeller) -> Result<Seller> {
        let row = sqlx::query(&format!(
            "INSERT INTO sellers (name, email, phone, address, zone_id, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {SELLER_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.address)
        .bind(new.zone_id.get())
        .bind(new.user_id.map(|u| u.get()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "seller", "email", new.email.clone()))?;

        metrics::counter!("store_rows_inserted_total", "table" => "sellers").increment(1);
        Self::row_to_seller(row)
    }

    async fn get_seller(&self, id: SellerId) -> Result<Option<Seller>> {
        sqlx::query(&format!("SELECT {SELLER_COLUMNS} FROM sellers WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_seller)
            .transpose()
    }

    async fn find_seller_by_email(&self, email: &str) -> Result<Option<Seller>> {
        sqlx::query(&format!("SELECT {SELLER_COLUMNS} FROM sellers WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_seller)
            .transpose()
    }

    async fn find_seller_by_user(&self, user_id: UserId) -> Result<Option<Seller>> {
        sqlx::query(&format!(
            "SELECT {SELLER_COLUMNS} FROM sellers WHERE user_id = $1 ORDER BY id LIMIT 1"
        ))
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_seller)
        .transpose()
    }

    async fn list_sellers(&self, query: &SellerQuery) -> Result<Vec<Seller>> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {SELLER_COLUMNS} FROM sellers WHERE 1=1"));
        if let Some(zone_id) = query.zone_id {
            builder.push(" AND zone_id = ").push_bind(zone_id.get());
        }
        if let Some(is_active) = query.is_active {
            builder.push(" AND is_active = ").push_bind(is_active);
        }
        builder
            .push(" ORDER BY id ASC LIMIT ")
            .push_bind(query.page.limit)
            .push(" OFFSET ")
            .push_bind(query.page.skip);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_seller).collect()
    }

    async fn update_seller(&self, seller: &Seller) -> Result<Seller> {
        let row = sqlx::query(&format!(
            "UPDATE sellers SET name = $2, email = $3, phone = $4, address = $5, zone_id = $6, \
             user_id = $7, is_active = $8, updated_at = NOW() \
             WHERE id = $1 RETURNING {SELLER_COLUMNS}"
        ))
        .bind(seller.id.get())
        .bind(&seller.name)
        .bind(&seller.email)
        .bind(&seller.phone)
        .bind(&seller.address)
        .bind(seller.zone_id.get())
        .bind(seller.user_id.map(|u| u.get()))
        .bind(seller.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "seller", "email", seller.email.clone()))?;

        match row {
            Some(row) => Self::row_to_seller(row),
            None => Err(StoreError::not_found("seller", seller.id)),
        }
    }

    async fn insert_shopkeeper(&self, new: NewShopkeeper) -> Result<Shopkeeper> {
        let row = sqlx::query(
            "INSERT INTO shopkeepers AS s \
                 (name, business_name, address, phone, email, latitude, longitude) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING s.id, s.name, s.business_name, s.address, s.phone, s.email, \
                 s.latitude, s.longitude, s.is_active, s.created_at, s.updated_at",
        )
        .bind(&new.name)
        .bind(&new.business_name)
        .bind(&new.address)
        .bind(&new.phone)
        .bind(&new.email)
        .bind(new.latitude)
        .bind(new.longitude)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "shopkeeper", "email", new.email.clone().unwrap_or_default()))?;

        metrics::counter!("store_rows_inserted_total", "table" => "shopkeepers").increment(1);
        Self::row_to_shopkeeper(row)
    }

    async fn get_shopkeeper(&self, id: ShopkeeperId) -> Result<Option<Shopkeeper>> {
        sqlx::query(&format!(
            "SELECT {SHOPKEEPER_COLUMNS} FROM shopkeepers s WHERE s.id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_shopkeeper)
        .transpose()
    }

    async fn find_shopkeeper_by_email(&self, email: &str) -> Result<Option<Shopkeeper>> {
        sqlx::query(&format!(
            "SELECT {SHOPKEEPER_COLUMNS} FROM shopkeepers s WHERE s.email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_shopkeeper)
        .transpose()
    }

    async fn list_shopkeepers(&self, query: &ShopkeeperQuery) -> Result<Vec<Shopkeeper>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {SHOPKEEPER_COLUMNS} FROM shopkeepers s \
             LEFT JOIN assignments a ON a.shopkeeper_id = s.id AND a.is_active \
             WHERE 1=1"
        ));
        if let Some(is_active) = query.is_active {
            builder.push(" AND s.is_active = ").push_bind(is_active);
        }
        if let Some(seller_id) = query.seller_id {
            builder.push(" AND a.seller_id = ").push_bind(seller_id.get());
        }
        if query.unassigned {
            builder.push(" AND a.id IS NULL");
        }
        builder
            .push(" ORDER BY s.id ASC LIMIT ")
            .push_bind(query.page.limit)
            .push(" OFFSET ")
            .push_bind(query.page.skip);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_shopkeeper).collect()
    }

    async fn list_unassigned_shopkeepers(&self) -> Result<Vec<Shopkeeper>> {
        let rows = sqlx::query(&format!(
            "SELECT {SHOPKEEPER_COLUMNS} FROM shopkeepers s \
             WHERE s.is_active AND NOT EXISTS ( \
                 SELECT 1 FROM assignments a WHERE a.shopkeeper_id = s.id AND a.is_active \
             ) ORDER BY s.id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_shopkeeper).collect()
    }

    async fn update_shopkeeper(&self, shopkeeper: &Shopkeeper) -> Result<Shopkeeper> {
        let row = sqlx::query(
            "UPDATE shopkeepers AS s SET name = $2, business_name = $3, address = $4, \
                 phone = $5, email = $6, latitude = $7, longitude = $8, is_active = $9, \
                 updated_at = NOW() \
             WHERE s.id = $1 \
             RETURNING s.id, s.name, s.business_name, s.address, s.phone, s.email, \
                 s.latitude, s.longitude, s.is_active, s.created_at, s.updated_at",
        )
        .bind(shopkeeper.id.get())
        .bind(&shopkeeper.name)
        .bind(&shopkeeper.business_name)
        .bind(&shopkeeper.address)
        .bind(&shopkeeper.phone)
        .bind(&shopkeeper.email)
        .bind(shopkeeper.latitude)
        .bind(shopkeeper.longitude)
        .bind(shopkeeper.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            unique_violation(
                e,
                "shopkeeper",
                "email",
                shopkeeper.email.clone().unwrap_or_default(),
            )
        })?;

        match row {
            Some(row) => Self::row_to_shopkeeper(row),
            None => Err(StoreError::not_found("shopkeeper", shopkeeper.id)),
        }
    }

    async fn insert_assignment(&self, new: NewAssignment) -> Result<Assignment> {
        let assignment = insert_assignment_in(&self.pool, &new).await?;
        metrics::counter!("store_rows_inserted_total", "table" => "assignments").increment(1);
        Ok(assignment)
    }

    async fn get_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>> {
        sqlx::query(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_assignment)
        .transpose()
    }

    async fn active_assignment_for(
        &self,
        shopkeeper_id: ShopkeeperId,
    ) -> Result<Option<Assignment>> {
        sqlx::query(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE shopkeeper_id = $1 AND is_active"
        ))
        .bind(shopkeeper_id.get())
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_assignment)
        .transpose()
    }

    async fn count_active_assignments(&self, seller_id: SellerId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM assignments WHERE seller_id = $1 AND is_active",
        )
        .bind(seller_id.get())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list_assignments(&self, query: &AssignmentQuery) -> Result<Vec<Assignment>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE 1=1"
        ));
        if let Some(is_active) = query.is_active {
            builder.push(" AND is_active = ").push_bind(is_active);
        }
        if let Some(seller_id) = query.seller_id {
            builder.push(" AND seller_id = ").push_bind(seller_id.get());
        }
        if let Some(shopkeeper_id) = query.shopkeeper_id {
            builder
                .push(" AND shopkeeper_id = ")
                .push_bind(shopkeeper_id.get());
        }
        builder
            .push(" ORDER BY id ASC LIMIT ")
            .push_bind(query.page.limit)
            .push(" OFFSET ")
            .push_bind(query.page.skip);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_assignment).collect()
    }

    async fn assignment_history(&self, shopkeeper_id: ShopkeeperId) -> Result<Vec<Assignment>> {
        let rows = sqlx::query(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE shopkeeper_id = $1 \
             ORDER BY assigned_at DESC, id DESC"
        ))
        .bind(shopkeeper_id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_assignment).collect()
    }

    async fn end_assignment(&self, id: AssignmentId, end: Unassignment) -> Result<Assignment> {
        end_assignment_in(&self.pool, id, end).await
    }

    async fn reassign(
        &self,
        current: AssignmentId,
        end: Unassignment,
        next: NewAssignment,
    ) -> Result<Assignment> {
        let mut tx = self.pool.begin().await?;

        end_assignment_in(&mut *tx, current, end).await?;
        let assignment = insert_assignment_in(&mut *tx, &next).await?;

        tx.commit().await?;
        metrics::counter!("store_rows_inserted_total", "table" => "assignments").increment(1);
        Ok(assignment)
    }

    async fn insert_visit(&self, new: NewVisit) -> Result<Visit> {
        let row = sqlx::query(&format!(
            "INSERT INTO visits (seller_id, shopkeeper_id, scheduled_date, status, reason, notes) \
             VALUES ($1, $2, $3, 'pending', $4, $5) RETURNING {VISIT_COLUMNS}"
        ))
        .bind(new.seller_id.get())
        .bind(new.shopkeeper_id.get())
        .bind(new.scheduled_date)
        .bind(&new.reason)
        .bind(&new.notes)
        .fetch_one(&self.pool)
        .await?;

        metrics::counter!("store_rows_inserted_total", "table" => "visits").increment(1);
        Self::row_to_visit(row)
    }

    async fn get_visit(&self, id: VisitId) -> Result<Option<Visit>> {
        sqlx::query(&format!("SELECT {VISIT_COLUMNS} FROM visits WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_visit)
            .transpose()
    }

    async fn update_visit(&self, visit: &Visit) -> Result<Visit> {
        let row = sqlx::query(&format!(
            "UPDATE visits SET scheduled_date = $2, status = $3, reason = $4, notes = $5, \
             completed_at = $6, cancelled_at = $7, cancelled_reason = $8, updated_at = NOW() \
             WHERE id = $1 RETURNING {VISIT_COLUMNS}"
        ))
        .bind(visit.id.get())
        .bind(visit.scheduled_date)
        .bind(visit.status.as_str())
        .bind(&visit.reason)
        .bind(&visit.notes)
        .bind(visit.completed_at)
        .bind(visit.cancelled_at)
        .bind(&visit.cancelled_reason)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_visit(row),
            None => Err(StoreError::not_found("visit", visit.id)),
        }
    }

    async fn list_visits(&self, query: &VisitQuery) -> Result<Vec<Visit>> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {VISIT_COLUMNS} FROM visits"));
        Self::push_visit_filters(&mut builder, query);
        builder
            .push(" ORDER BY scheduled_date ASC, id ASC LIMIT ")
            .push_bind(query.page.limit)
            .push(" OFFSET ")
            .push_bind(query.page.skip);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_visit).collect()
    }

    async fn count_visits(&self, query: &VisitQuery) -> Result<VisitCounts> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) AS total, \
                 COUNT(*) FILTER (WHERE status = 'pending') AS pending, \
                 COUNT(*) FILTER (WHERE status = 'completed') AS completed, \
                 COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled \
             FROM visits",
        );
        Self::push_visit_filters(&mut builder, query);

        let row = builder.build().fetch_one(&self.pool).await?;
        Ok(VisitCounts {
            total: row.try_get("total")?,
            pending: row.try_get("pending")?,
            completed: row.try_get("completed")?,
            cancelled: row.try_get("cancelled")?,
        })
    }

    async fn insert_incident(&self, new: NewIncident) -> Result<SellerIncident> {
        let row = sqlx::query(&format!(
            "INSERT INTO seller_incidents \
                 (seller_id, shopkeeper_id, visit_id, type, description, incident_date) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {INCIDENT_COLUMNS}"
        ))
        .bind(new.seller_id.get())
        .bind(new.shopkeeper_id.map(|s| s.get()))
        .bind(new.visit_id.map(|v| v.get()))
        .bind(new.kind.as_str())
        .bind(&new.description)
        .bind(new.incident_date)
        .fetch_one(&self.pool)
        .await?;

        metrics::counter!("store_rows_inserted_total", "table" => "seller_incidents").increment(1);
        Self::row_to_incident(row)
    }

    async fn get_incident(&self, id: IncidentId) -> Result<Option<SellerIncident>> {
        sqlx::query(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM seller_incidents WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_incident)
        .transpose()
    }

    async fn update_incident(&self, incident: &SellerIncident) -> Result<SellerIncident> {
        let row = sqlx::query(&format!(
            "UPDATE seller_incidents SET seller_id = $2, shopkeeper_id = $3, visit_id = $4, \
             type = $5, description = $6, incident_date = $7, updated_at = NOW() \
             WHERE id = $1 RETURNING {INCIDENT_COLUMNS}"
        ))
        .bind(incident.id.get())
        .bind(incident.seller_id.get())
        .bind(incident.shopkeeper_id.map(|s| s.get()))
        .bind(incident.visit_id.map(|v| v.get()))
        .bind(incident.kind.as_str())
        .bind(&incident.description)
        .bind(incident.incident_date)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_incident(row),
            None => Err(StoreError::not_found("incident", incident.id)),
        }
    }

    async fn delete_incident(&self, id: IncidentId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM seller_incidents WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_incidents(&self, query: &IncidentQuery) -> Result<Vec<SellerIncident>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {INCIDENT_COLUMNS} FROM seller_incidents WHERE 1=1"
        ));
        if let Some(seller_id) = query.seller_id {
            builder.push(" AND seller_id = ").push_bind(seller_id.get());
        }
        if let Some(shopkeeper_id) = query.shopkeeper_id {
            builder
                .push(" AND shopkeeper_id = ")
                .push_bind(shopkeeper_id.get());
        }
        if let Some(visit_id) = query.visit_id {
            builder.push(" AND visit_id = ").push_bind(visit_id.get());
        }
        if let Some(kind) = query.kind {
            builder.push(" AND type = ").push_bind(kind.as_str());
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_incident).collect()
    }

    async fn insert_inventory_item(&self, new: NewInventoryItem) -> Result<InventoryItem> {
        let row = sqlx::query(&format!(
            "INSERT INTO inventories \
                 (shopkeeper_id, product_id, unit_price, current_stock, min_stock, max_stock, \
                  product_name, product_description, product_category, product_brand, \
                  is_validated, validated_by, validated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {INVENTORY_COLUMNS}"
        ))
        .bind(new.shopkeeper_id.get())
        .bind(new.product_id.get())
        .bind(new.unit_price)
        .bind(new.current_stock)
        .bind(new.min_stock)
        .bind(new.max_stock)
        .bind(&new.product_name)
        .bind(&new.product_description)
        .bind(&new.product_category)
        .bind(&new.product_brand)
        .bind(new.validated_by.is_some() || new.validated_at.is_some())
        .bind(new.validated_by.map(|u| u.get()))
        .bind(new.validated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            unique_violation(e, "inventory item", "product_id", new.product_id.to_string())
        })?;

        metrics::counter!("store_rows_inserted_total", "table" => "inventories").increment(1);
        Self::row_to_inventory_item(row)
    }

    async fn get_inventory_item(&self, id: InventoryId) -> Result<Option<InventoryItem>> {
        sqlx::query(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventories WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_inventory_item)
        .transpose()
    }

    async fn find_inventory_item(
        &self,
        shopkeeper_id: ShopkeeperId,
        product_id: ProductId,
    ) -> Result<Option<InventoryItem>> {
        sqlx::query(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventories \
             WHERE shopkeeper_id = $1 AND product_id = $2"
        ))
        .bind(shopkeeper_id.get())
        .bind(product_id.get())
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_inventory_item)
        .transpose()
    }

    async fn update_inventory_item(&self, item: &InventoryItem) -> Result<InventoryItem> {
        let row = sqlx::query(&format!(
            "UPDATE inventories SET unit_price = $2, current_stock = $3, min_stock = $4, \
             max_stock = $5, product_name = $6, product_description = $7, \
             product_category = $8, product_brand = $9, is_active = $10, last_updated = $11, \
             updated_at = NOW() \
             WHERE id = $1 RETURNING {INVENTORY_COLUMNS}"
        ))
        .bind(item.id.get())
        .bind(item.unit_price)
        .bind(item.current_stock)
        .bind(item.min_stock)
        .bind(item.max_stock)
        .bind(&item.product_name)
        .bind(&item.product_description)
        .bind(&item.product_category)
        .bind(&item.product_brand)
        .bind(item.is_active)
        .bind(item.last_updated)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_inventory_item(row),
            None => Err(StoreError::not_found("inventory item", item.id)),
        }
    }

    async fn delete_inventory_item(&self, id: InventoryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM inventories WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_inventory(&self, query: &InventoryQuery) -> Result<Vec<InventoryItem>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventories WHERE 1=1"
        ));
        if let Some(shopkeeper_id) = query.shopkeeper_id {
            builder
                .push(" AND shopkeeper_id = ")
                .push_bind(shopkeeper_id.get());
        }
        if let Some(is_active) = query.is_active {
            builder.push(" AND is_active = ").push_bind(is_active);
        }
        if query.low_stock_only {
            builder.push(" AND current_stock < min_stock");
        }
        builder.push(" ORDER BY id ASC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_inventory_item).collect()
    }
}
