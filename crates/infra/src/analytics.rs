//! Dashboard analytics: pure read-side aggregations over the two stores.
//!
//! Every operation reads a snapshot and computes in memory; nothing here
//! mutates. Any store failure surfaces as the single "aggregation failed"
//! error — an aggregation never returns a partial result.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use chainvoice_core::{chain_name, OwnerId};
use chainvoice_invoicing::InvoiceStatus;
use chainvoice_payments::TransactionStatus;

use crate::store::{InvoiceStore, StoreError, TransactionStore};

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("aggregation failed")]
    Aggregation(#[from] StoreError),
}

/// Count + summed amount for one invoice status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceStatusStat {
    pub status: InvoiceStatus,
    pub count: u64,
    pub amount: f64,
}

/// Counts and summed totals grouped by invoice status, plus grand totals.
/// `by_status` always carries one entry per status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceStats {
    pub total_count: u64,
    pub total_amount: f64,
    pub by_status: Vec<InvoiceStatusStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionStatusStat {
    pub status: TransactionStatus,
    pub count: u64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkCount {
    pub network_id: u64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionStats {
    pub total_count: u64,
    pub total_amount: f64,
    pub by_status: Vec<TransactionStatusStat>,
    pub networks: Vec<NetworkCount>,
}

/// One chart slice per invoice status. Zero-count statuses are retained here;
/// the chart renderer filters them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSlice {
    pub status: InvoiceStatus,
    pub label: &'static str,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkStat {
    pub network_id: u64,
    pub network_name: &'static str,
    pub count: u64,
    pub total_amount: f64,
}

/// Revenue for one calendar month. Months with no paid invoices report zero
/// rather than being omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRevenue {
    /// Display label, e.g. "Mar 2026".
    pub month: String,
    pub revenue: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopClient {
    pub client_name: String,
    pub client_email: String,
    pub total_revenue: f64,
    pub invoice_count: u64,
    pub last_invoice_date: DateTime<Utc>,
}

/// Read-side aggregation service over the invoice and transaction stores.
#[derive(Clone)]
pub struct Analytics {
    invoices: Arc<dyn InvoiceStore>,
    transactions: Arc<dyn TransactionStore>,
}

impl Analytics {
    pub fn new(invoices: Arc<dyn InvoiceStore>, transactions: Arc<dyn TransactionStore>) -> Self {
        Self {
            invoices,
            transactions,
        }
    }

    pub async fn invoice_stats(&self, owner: OwnerId) -> Result<InvoiceStats, AnalyticsError> {
        let invoices = self.invoices.list(owner).await?;

        let mut by_status: Vec<InvoiceStatusStat> = InvoiceStatus::ALL
            .iter()
            .map(|&status| InvoiceStatusStat {
                status,
                count: 0,
                amount: 0.0,
            })
            .collect();

        let mut total_count = 0u64;
        let mut total_amount = 0.0f64;
        for invoice in &invoices {
            total_count += 1;
            total_amount += invoice.total_amount;
            if let Some(stat) = by_status.iter_mut().find(|s| s.status == invoice.status) {
                stat.count += 1;
                stat.amount += invoice.total_amount;
            }
        }

        Ok(InvoiceStats {
            total_count,
            total_amount,
            by_status,
        })
    }

    pub async fn transaction_stats(
        &self,
        owner: OwnerId,
    ) -> Result<TransactionStats, AnalyticsError> {
        let transactions = self.transactions.list(owner).await?;

        let mut by_status: Vec<TransactionStatusStat> = TransactionStatus::ALL
            .iter()
            .map(|&status| TransactionStatusStat {
                status,
                count: 0,
                amount: 0.0,
            })
            .collect();

        let mut network_counts: HashMap<u64, u64> = HashMap::new();
        let mut total_count = 0u64;
        let mut total_amount = 0.0f64;
        for tx in &transactions {
            total_count += 1;
            total_amount += tx.amount;
            if let Some(stat) = by_status.iter_mut().find(|s| s.status == tx.status) {
                stat.count += 1;
                stat.amount += tx.amount;
            }
            *network_counts.entry(tx.network_id).or_default() += 1;
        }

        let mut networks: Vec<NetworkCount> = network_counts
            .into_iter()
            .map(|(network_id, count)| NetworkCount { network_id, count })
            .collect();
        networks.sort_by(|a, b| b.count.cmp(&a.count).then(a.network_id.cmp(&b.network_id)));

        Ok(TransactionStats {
            total_count,
            total_amount,
            by_status,
            networks,
        })
    }

    /// One entry per invoice status, zero counts included.
    pub async fn payment_status_distribution(
        &self,
        owner: OwnerId,
    ) -> Result<Vec<StatusSlice>, AnalyticsError> {
        let invoices = self.invoices.list(owner).await?;

        Ok(InvoiceStatus::ALL
            .iter()
            .map(|&status| StatusSlice {
                status,
                label: status.label(),
                count: invoices.iter().filter(|i| i.status == status).count() as u64,
            })
            .collect())
    }

    /// Transaction volume per network, sorted by count descending.
    pub async fn network_distribution(
        &self,
        owner: OwnerId,
    ) -> Result<Vec<NetworkStat>, AnalyticsError> {
        let transactions = self.transactions.list(owner).await?;

        let mut grouped: HashMap<u64, (u64, f64)> = HashMap::new();
        for tx in &transactions {
            let entry = grouped.entry(tx.network_id).or_default();
            entry.0 += 1;
            entry.1 += tx.amount;
        }

        let mut stats: Vec<NetworkStat> = grouped
            .into_iter()
            .map(|(network_id, (count, total_amount))| NetworkStat {
                network_id,
                network_name: chain_name(network_id),
                count,
                total_amount,
            })
            .collect();
        stats.sort_by(|a, b| b.count.cmp(&a.count).then(a.network_id.cmp(&b.network_id)));
        Ok(stats)
    }

    /// Paid revenue for each of the last `months_back` calendar months
    /// (current month inclusive), oldest first. The sequence is dense:
    /// months with no paid invoices report zero.
    pub async fn monthly_revenue(
        &self,
        owner: OwnerId,
        months_back: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<MonthlyRevenue>, AnalyticsError> {
        let invoices = self.invoices.list(owner).await?;

        let mut buckets: HashMap<(i32, u32), (f64, u64)> = HashMap::new();
        for invoice in &invoices {
            if invoice.status != InvoiceStatus::Paid {
                continue;
            }
            let Some(paid_at) = invoice.paid_at else {
                continue;
            };
            let entry = buckets.entry((paid_at.year(), paid_at.month())).or_default();
            entry.0 += invoice.total_amount;
            entry.1 += 1;
        }

        let mut series = Vec::with_capacity(months_back as usize);
        for back in (0..months_back).rev() {
            let (year, month) = months_before(now, back);
            let (revenue, count) = buckets.get(&(year, month)).copied().unwrap_or((0.0, 0));
            series.push(MonthlyRevenue {
                month: month_label(year, month),
                revenue,
                count,
            });
        }
        Ok(series)
    }

    /// Top clients by paid revenue. Clients without a paid invoice never
    /// appear.
    pub async fn top_clients(
        &self,
        owner: OwnerId,
        limit: usize,
    ) -> Result<Vec<TopClient>, AnalyticsError> {
        let invoices = self.invoices.list(owner).await?;

        let mut grouped: HashMap<(String, String), TopClient> = HashMap::new();
        for invoice in &invoices {
            if invoice.status != InvoiceStatus::Paid {
                continue;
            }
            let key = (invoice.client_name.clone(), invoice.client_email.clone());
            let entry = grouped.entry(key).or_insert_with(|| TopClient {
                client_name: invoice.client_name.clone(),
                client_email: invoice.client_email.clone(),
                total_revenue: 0.0,
                invoice_count: 0,
                last_invoice_date: invoice.created_at,
            });
            entry.total_revenue += invoice.total_amount;
            entry.invoice_count += 1;
            if invoice.created_at > entry.last_invoice_date {
                entry.last_invoice_date = invoice.created_at;
            }
        }

        let mut clients: Vec<TopClient> = grouped.into_values().collect();
        clients.sort_by(|a, b| {
            b.total_revenue
                .total_cmp(&a.total_revenue)
                .then_with(|| a.client_name.cmp(&b.client_name))
        });
        clients.truncate(limit);
        Ok(clients)
    }
}

/// The calendar month `back` months before `now`.
fn months_before(now: DateTime<Utc>, back: u32) -> (i32, u32) {
    let total = now.year() * 12 + now.month() as i32 - 1 - back as i32;
    (total.div_euclid(12), total.rem_euclid(12) as u32 + 1)
}

fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%b %Y").to_string())
        .unwrap_or_else(|| format!("{year}-{month:02}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryInvoiceStore, InMemoryTransactionStore};
    use chainvoice_invoicing::{NewInvoice, NewInvoiceItem, ValidInvoice};
    use chainvoice_payments::{NewTransaction, ValidTransaction};
    use chrono::{Duration, TimeZone};

    fn invoice_input(client: &str, amount: f64) -> ValidInvoice {
        NewInvoice {
            client_name: client.to_string(),
            client_email: format!("{}@example.com", client.to_lowercase()),
            client_address: None,
            items: vec![NewInvoiceItem {
                description: "Work".to_string(),
                quantity: 1,
                unit_price: amount,
                amount,
            }],
            notes: None,
            terms: None,
            due_date: Utc::now() + Duration::days(30),
            payment_address: None,
            payment_token_type: None,
            draft: false,
        }
        .validate()
        .unwrap()
    }

    fn tx_input(amount: f64, network_id: u64, status: Option<TransactionStatus>) -> ValidTransaction {
        NewTransaction {
            amount,
            token_type: "ETH".to_string(),
            from_address: format!("0x{}", "1".repeat(40)),
            to_address: format!("0x{}", "2".repeat(40)),
            hash: format!("0x{}", uuid::Uuid::new_v4().simple()),
            invoice_id: None,
            description: None,
            network_id,
            status,
        }
        .validate()
        .unwrap()
    }

    struct Fixture {
        analytics: Analytics,
        invoices: Arc<InMemoryInvoiceStore>,
        transactions: Arc<InMemoryTransactionStore>,
        owner: OwnerId,
    }

    fn fixture() -> Fixture {
        let invoices = Arc::new(InMemoryInvoiceStore::new());
        let transactions = Arc::new(InMemoryTransactionStore::new());
        Fixture {
            analytics: Analytics::new(invoices.clone(), transactions.clone()),
            invoices,
            transactions,
            owner: OwnerId::new(),
        }
    }

    async fn paid_invoice(f: &Fixture, client: &str, amount: f64, paid_at: DateTime<Utc>) {
        let invoice = f
            .invoices
            .create(f.owner, invoice_input(client, amount), paid_at - Duration::days(3))
            .await
            .unwrap();
        f.invoices
            .mark_paid(f.owner, invoice.id, "0xhash", paid_at)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn invoice_stats_cover_every_status_with_totals() {
        let f = fixture();
        let now = Utc::now();

        f.invoices
            .create(f.owner, invoice_input("Alpha", 100.0), now)
            .await
            .unwrap();
        paid_invoice(&f, "Beta", 400.0, now).await;

        let stats = f.analytics.invoice_stats(f.owner).await.unwrap();

        assert_eq!(stats.total_count, 2);
        assert_eq!(stats.total_amount, 500.0);
        assert_eq!(stats.by_status.len(), InvoiceStatus::ALL.len());

        let pending = stats
            .by_status
            .iter()
            .find(|s| s.status == InvoiceStatus::Pending)
            .unwrap();
        assert_eq!((pending.count, pending.amount), (1, 100.0));

        let draft = stats
            .by_status
            .iter()
            .find(|s| s.status == InvoiceStatus::Draft)
            .unwrap();
        assert_eq!((draft.count, draft.amount), (0, 0.0));
    }

    #[tokio::test]
    async fn transaction_stats_break_down_status_and_network() {
        let f = fixture();
        let now = Utc::now();

        f.transactions
            .create(f.owner, tx_input(1.0, 1, None), now)
            .await
            .unwrap();
        f.transactions
            .create(f.owner, tx_input(2.0, 137, None), now)
            .await
            .unwrap();
        f.transactions
            .create(
                f.owner,
                tx_input(4.0, 137, Some(TransactionStatus::Failed)),
                now,
            )
            .await
            .unwrap();

        let stats = f.analytics.transaction_stats(f.owner).await.unwrap();

        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.total_amount, 7.0);

        let confirmed = stats
            .by_status
            .iter()
            .find(|s| s.status == TransactionStatus::Confirmed)
            .unwrap();
        assert_eq!((confirmed.count, confirmed.amount), (2, 3.0));

        // Polygon has more transactions, so it sorts first.
        assert_eq!(stats.networks[0], NetworkCount { network_id: 137, count: 2 });
        assert_eq!(stats.networks[1], NetworkCount { network_id: 1, count: 1 });
    }

    #[tokio::test]
    async fn status_distribution_retains_zero_counts() {
        let f = fixture();
        paid_invoice(&f, "Alpha", 50.0, Utc::now()).await;

        let slices = f.analytics.payment_status_distribution(f.owner).await.unwrap();

        assert_eq!(slices.len(), InvoiceStatus::ALL.len());
        let paid = slices.iter().find(|s| s.status == InvoiceStatus::Paid).unwrap();
        assert_eq!(paid.count, 1);
        assert_eq!(paid.label, "Paid");
        assert!(slices
            .iter()
            .filter(|s| s.status != InvoiceStatus::Paid)
            .all(|s| s.count == 0));
    }

    #[tokio::test]
    async fn network_distribution_resolves_names_and_sorts_by_count() {
        let f = fixture();
        let now = Utc::now();

        for _ in 0..3 {
            f.transactions
                .create(f.owner, tx_input(1.0, 8453, None), now)
                .await
                .unwrap();
        }
        f.transactions
            .create(f.owner, tx_input(5.0, 424242, None), now)
            .await
            .unwrap();

        let stats = f.analytics.network_distribution(f.owner).await.unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].network_name, "Base");
        assert_eq!(stats[0].count, 3);
        assert_eq!(stats[0].total_amount, 3.0);
        assert_eq!(stats[1].network_name, "Unknown Chain");
    }

    #[tokio::test]
    async fn monthly_revenue_is_dense_and_ordered() {
        let f = fixture();
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();

        // Two months ago and this month have revenue; last month is empty.
        paid_invoice(&f, "Alpha", 100.0, Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap()).await;
        paid_invoice(&f, "Beta", 250.0, Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()).await;
        // Pending invoices never count toward revenue.
        f.invoices
            .create(f.owner, invoice_input("Gamma", 999.0), now)
            .await
            .unwrap();

        let series = f.analytics.monthly_revenue(f.owner, 3, now).await.unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series[0].month, "Jan 2026");
        assert_eq!((series[0].revenue, series[0].count), (100.0, 1));
        assert_eq!(series[1].month, "Feb 2026");
        assert_eq!((series[1].revenue, series[1].count), (0.0, 0));
        assert_eq!(series[2].month, "Mar 2026");
        assert_eq!((series[2].revenue, series[2].count), (250.0, 1));
    }

    #[tokio::test]
    async fn monthly_revenue_crosses_year_boundaries() {
        let f = fixture();
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();

        paid_invoice(&f, "Alpha", 75.0, Utc.with_ymd_and_hms(2025, 12, 31, 23, 0, 0).unwrap()).await;

        let series = f.analytics.monthly_revenue(f.owner, 2, now).await.unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].month, "Dec 2025");
        assert_eq!(series[0].revenue, 75.0);
        assert_eq!(series[1].month, "Jan 2026");
        assert_eq!(series[1].revenue, 0.0);
    }

    #[tokio::test]
    async fn zero_months_back_yields_an_empty_series() {
        let f = fixture();
        let series = f.analytics.monthly_revenue(f.owner, 0, Utc::now()).await.unwrap();
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn top_clients_sorts_by_revenue_and_respects_limit() {
        let f = fixture();
        let now = Utc::now();

        paid_invoice(&f, "Alpha", 100.0, now - Duration::days(10)).await;
        paid_invoice(&f, "Alpha", 150.0, now).await;
        paid_invoice(&f, "Beta", 400.0, now).await;
        paid_invoice(&f, "Delta", 10.0, now).await;
        // Pending-only clients are excluded outright.
        f.invoices
            .create(f.owner, invoice_input("Pendy", 9_999.0), now)
            .await
            .unwrap();

        let top = f.analytics.top_clients(f.owner, 2).await.unwrap();

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].client_name, "Beta");
        assert_eq!(top[0].total_revenue, 400.0);
        assert_eq!(top[1].client_name, "Alpha");
        assert_eq!(top[1].total_revenue, 250.0);
        assert_eq!(top[1].invoice_count, 2);

        let all = f.analytics.top_clients(f.owner, 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|c| c.client_name != "Pendy"));
    }

    #[tokio::test]
    async fn top_clients_tracks_latest_invoice_date() {
        let f = fixture();
        let now = Utc::now();

        paid_invoice(&f, "Alpha", 100.0, now - Duration::days(30)).await;
        paid_invoice(&f, "Alpha", 100.0, now).await;

        let top = f.analytics.top_clients(f.owner, 5).await.unwrap();
        assert_eq!(top.len(), 1);
        // created_at is paid_at - 3 days in the fixture; the max is kept.
        assert!(top[0].last_invoice_date > now - Duration::days(5));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            /// Property: grand totals always equal the sum of the per-status
            /// breakdown.
            #[test]
            fn invoice_stats_totals_match_breakdown(
                amounts in prop::collection::vec(0.0f64..10_000.0, 0..20),
                statuses in prop::collection::vec(0usize..5, 0..20)
            ) {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .build()
                    .unwrap();
                rt.block_on(async {
                    let f = fixture();
                    let now = Utc::now();

                    for (i, amount) in amounts.iter().enumerate() {
                        let status = InvoiceStatus::ALL[statuses.get(i).copied().unwrap_or(0) % 5];
                        let invoice = f
                            .invoices
                            .create(f.owner, invoice_input("Client", *amount), now)
                            .await
                            .unwrap();
                        f.invoices
                            .update_status(f.owner, invoice.id, status, now)
                            .await
                            .unwrap();
                    }

                    let stats = f.analytics.invoice_stats(f.owner).await.unwrap();
                    let count_sum: u64 = stats.by_status.iter().map(|s| s.count).sum();
                    let amount_sum: f64 = stats.by_status.iter().map(|s| s.amount).sum();

                    assert_eq!(count_sum, stats.total_count);
                    assert!((amount_sum - stats.total_amount).abs() < 1e-6);
                });
            }
        }
    }
}
