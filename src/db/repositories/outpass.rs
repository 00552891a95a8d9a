use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tracing::info;

use crate::domain::{GateEvent, OutPassStatus};
use crate::entities::{outpasses, prelude::*};
use crate::models::{Hostel, Hosteler, HostelPageFilter, NewOutPass, OutPass, OutPassWithRefs};
use crate::models::outpass::SortDirection;

fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Repository for out-pass records.
///
/// All status transitions go through conditional updates ("set status = X
/// where status = Y"), so two concurrent callers can never both apply the
/// same transition.
pub struct OutPassRepository {
    conn: DatabaseConnection,
}

impl OutPassRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn lift(model: outpasses::Model) -> Result<OutPass> {
        OutPass::try_from(model).map_err(|e| anyhow::anyhow!("corrupt out-pass row: {e}"))
    }

    pub async fn insert(&self, new: &NewOutPass) -> Result<OutPass> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = outpasses::ActiveModel {
            hosteler_id: Set(new.hosteler_id),
            hostel_id: Set(new.hostel_id),
            room_number: Set(new.room_number.clone()),
            address: Set(new.address.clone()),
            reason: Set(new.reason.as_str().to_string()),
            expected_out_time: Set(new.expected_out_time.clone()),
            expected_in_time: Set(new.expected_in_time.clone()),
            actual_out_time: Set(None),
            actual_in_time: Set(None),
            status: Set(OutPassStatus::Pending.as_str().to_string()),
            valid_till: Set(new.valid_till.clone()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert out-pass")?;

        info!(
            "Created out-pass {} for hosteler {} (reason: {})",
            model.id, new.hosteler_id, new.reason
        );

        Self::lift(model)
    }

    pub async fn get(&self, id: i32) -> Result<Option<OutPass>> {
        let model = Outpasses::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query out-pass")?;

        model.map(Self::lift).transpose()
    }

    pub async fn get_with_refs(&self, id: i32) -> Result<Option<OutPassWithRefs>> {
        let Some((pass, hosteler)) = Outpasses::find_by_id(id)
            .find_also_related(Hostelers)
            .one(&self.conn)
            .await
            .context("Failed to query out-pass with hosteler")?
        else {
            return Ok(None);
        };

        let hosteler =
            hosteler.ok_or_else(|| anyhow::anyhow!("out-pass {id} has no hosteler row"))?;

        let hostel = Hostels::find_by_id(pass.hostel_id)
            .one(&self.conn)
            .await
            .context("Failed to query hostel for out-pass")?
            .ok_or_else(|| anyhow::anyhow!("out-pass {id} has no hostel row"))?;

        Ok(Some(OutPassWithRefs {
            pass: Self::lift(pass)?,
            student: Hosteler::from(hosteler),
            hostel: Hostel::from(hostel),
        }))
    }

    /// Most-recent-first history for one hosteler, capped at `limit`.
    pub async fn list_for_hosteler(&self, hosteler_id: i32, limit: u64) -> Result<Vec<OutPass>> {
        let rows = Outpasses::find()
            .filter(outpasses::Column::HostelerId.eq(hosteler_id))
            .order_by_desc(outpasses::Column::CreatedAt)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list out-passes for hosteler")?;

        rows.into_iter().map(Self::lift).collect()
    }

    /// Warden view: one page of a hostel's out-passes with student and
    /// hostel projections. A query matching nothing yields an empty page.
    pub async fn list_for_hostel(
        &self,
        hostel_id: i32,
        filter: &HostelPageFilter,
    ) -> Result<Vec<OutPassWithRefs>> {
        let Some(hostel) = Hostels::find_by_id(hostel_id)
            .one(&self.conn)
            .await
            .context("Failed to query hostel")?
        else {
            return Ok(Vec::new());
        };
        let hostel = Hostel::from(hostel);

        let mut select = Outpasses::find()
            .find_also_related(Hostelers)
            .filter(outpasses::Column::HostelId.eq(hostel_id));

        if let Some(query) = filter.query.as_deref() {
            let query = query.trim();
            if !query.is_empty() {
                // SQLite LIKE is case-insensitive for ASCII. The pattern is
                // escaped so % and _ in the input match literally.
                let pattern = format!("%{}%", escape_like(query));
                select = select.filter(
                    Condition::any()
                        .add(
                            crate::entities::hostelers::Column::Name
                                .like(LikeExpr::new(pattern.as_str()).escape('\\')),
                        )
                        .add(
                            crate::entities::hostelers::Column::RollNumber
                                .like(LikeExpr::new(pattern.as_str()).escape('\\')),
                        ),
                );
            }
        }

        select = match filter.sort {
            SortDirection::Asc => select.order_by_asc(outpasses::Column::CreatedAt),
            SortDirection::Desc => select.order_by_desc(outpasses::Column::CreatedAt),
        };

        let rows = select
            .offset(filter.offset)
            .limit(filter.limit)
            .all(&self.conn)
            .await
            .context("Failed to list out-passes for hostel")?;

        rows.into_iter()
            .map(|(pass, hosteler)| {
                let hosteler = hosteler
                    .ok_or_else(|| anyhow::anyhow!("out-pass {} has no hosteler row", pass.id))?;
                Ok(OutPassWithRefs {
                    pass: Self::lift(pass)?,
                    student: Hosteler::from(hosteler),
                    hostel: hostel.clone(),
                })
            })
            .collect()
    }

    /// Moves `id` from `from` to `to` if and only if it currently holds
    /// `from`. Returns whether the transition applied.
    pub async fn transition_status(
        &self,
        id: i32,
        from: OutPassStatus,
        to: OutPassStatus,
    ) -> Result<bool> {
        debug_assert!(from.can_transition_to(to));

        let result = Outpasses::update_many()
            .col_expr(outpasses::Column::Status, Expr::value(to.as_str()))
            .col_expr(
                outpasses::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(outpasses::Column::Id.eq(id))
            .filter(outpasses::Column::Status.eq(from.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to transition out-pass status")?;

        Ok(result.rows_affected > 0)
    }

    /// Records a gate scan: stamps the actual out/in time and advances the
    /// status, guarded on the required prior status and an unset time column
    /// so a duplicate scan can never overwrite the first.
    pub async fn record_gate_event(
        &self,
        id: i32,
        event: GateEvent,
        stamp: &str,
    ) -> Result<bool> {
        let time_column = match event {
            GateEvent::Exit => outpasses::Column::ActualOutTime,
            GateEvent::Entry => outpasses::Column::ActualInTime,
        };

        let result = Outpasses::update_many()
            .col_expr(time_column, Expr::value(stamp))
            .col_expr(
                outpasses::Column::Status,
                Expr::value(event.resulting_status().as_str()),
            )
            .col_expr(
                outpasses::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(outpasses::Column::Id.eq(id))
            .filter(outpasses::Column::Status.eq(event.required_status().as_str()))
            .filter(time_column.is_null())
            .exec(&self.conn)
            .await
            .context("Failed to record gate event")?;

        Ok(result.rows_affected > 0)
    }
}
