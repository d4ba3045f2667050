use anyhow::Result;
use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite};

use crate::db::{new_id, HedgeDb};
use crate::models::{MacroData, MacroDataInput};

#[derive(Clone)]
pub struct MacroStore {
    db: HedgeDb,
}

impl MacroStore {
    pub fn new(db: HedgeDb) -> Self {
        Self { db }
    }

    /// Insert or replace the snapshot for a date.
    pub async fn upsert(&self, input: MacroDataInput) -> Result<MacroData> {
        let id = new_id();
        let row = sqlx::query_as::<_, MacroData>(
            r#"
            INSERT INTO macro_data
            (id, data_date, dxy_value, dxy_change_1d, dxy_change_ytd,
             gold_price, silver_price, platinum_price, oil_wti_price, copper_price,
             m2_supply_trillions, m2_yoy_change, fed_funds_rate, ten_year_yield,
             cpi_yoy, pce_yoy, eur_usd, usd_jpy, gbp_usd, usd_cny)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(data_date) DO UPDATE SET
                dxy_value = excluded.dxy_value,
                dxy_change_1d = excluded.dxy_change_1d,
                dxy_change_ytd = excluded.dxy_change_ytd,
                gold_price = excluded.gold_price,
                silver_price = excluded.silver_price,
                platinum_price = excluded.platinum_price,
                oil_wti_price = excluded.oil_wti_price,
                copper_price = excluded.copper_price,
                m2_supply_trillions = excluded.m2_supply_trillions,
                m2_yoy_change = excluded.m2_yoy_change,
                fed_funds_rate = excluded.fed_funds_rate,
                ten_year_yield = excluded.ten_year_yield,
                cpi_yoy = excluded.cpi_yoy,
                pce_yoy = excluded.pce_yoy,
                eur_usd = excluded.eur_usd,
                usd_jpy = excluded.usd_jpy,
                gbp_usd = excluded.gbp_usd,
                usd_cny = excluded.usd_cny
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(input.data_date)
        .bind(input.dxy_value)
        .bind(input.dxy_change_1d)
        .bind(input.dxy_change_ytd)
        .bind(input.gold_price)
        .bind(input.silver_price)
        .bind(input.platinum_price)
        .bind(input.oil_wti_price)
        .bind(input.copper_price)
        .bind(input.m2_supply_trillions)
        .bind(input.m2_yoy_change)
        .bind(input.fed_funds_rate)
        .bind(input.ten_year_yield)
        .bind(input.cpi_yoy)
        .bind(input.pce_yoy)
        .bind(input.eur_usd)
        .bind(input.usd_jpy)
        .bind(input.gbp_usd)
        .bind(input.usd_cny)
        .fetch_one(self.db.pool())
        .await?;

        Ok(row)
    }

    pub async fn latest(&self) -> Result<Option<MacroData>> {
        let row =
            sqlx::query_as::<_, MacroData>("SELECT * FROM macro_data ORDER BY data_date DESC LIMIT 1")
                .fetch_optional(self.db.pool())
                .await?;

        Ok(row)
    }

    pub async fn history(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        limit: i64,
    ) -> Result<Vec<MacroData>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM macro_data WHERE 1 = 1");
        if let Some(start) = start_date {
            qb.push(" AND data_date >= ").push_bind(start);
        }
        if let Some(end) = end_date {
            qb.push(" AND data_date <= ").push_bind(end);
        }
        qb.push(" ORDER BY data_date DESC LIMIT ").push_bind(limit);

        let rows = qb
            .build_query_as::<MacroData>()
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_unique_per_date() {
        let store = MacroStore::new(HedgeDb::new("sqlite::memory:").await.unwrap());

        let date: NaiveDate = "2026-07-01".parse().unwrap();
        store
            .upsert(MacroDataInput {
                data_date: date,
                gold_price: Some(3300.0),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .upsert(MacroDataInput {
                data_date: date,
                gold_price: Some(3350.0),
                ..Default::default()
            })
            .await
            .unwrap();

        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.gold_price, Some(3350.0));
        assert_eq!(store.history(None, None, 10).await.unwrap().len(), 1);
    }
}
