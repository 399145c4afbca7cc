//! Metrics and tracing instrumentation.
//!
//! With the `metrics` feature, [`METRICS`] holds OpenTelemetry instruments
//! exported through a Prometheus registry; [`HydratorMetrics::render`] returns
//! the text exposition format. With the `tracing` feature,
//! [`tracing_helpers`] builds the spans entered around queries, connections
//! and result set materialization.

#[cfg(feature = "metrics")]
pub use self::otel::{HydratorMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use once_cell::sync::Lazy;
    use opentelemetry::metrics::{Counter, Histogram, MeterProvider as _};
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Encoder, Registry, TextEncoder};
    use std::time::Duration;

    pub static METRICS: Lazy<HydratorMetrics> = Lazy::new(HydratorMetrics::init);

    pub struct HydratorMetrics {
        registry: Registry,
        _provider: SdkMeterProvider,
        pub queries_total: Counter<u64>,
        pub query_errors_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
        pub connection_wait_duration: Histogram<f64>,
        pub hydrated_rows_total: Counter<u64>,
        pub hydration_duration: Histogram<f64>,
    }

    impl HydratorMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let provider = match opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
            {
                Ok(exporter) => SdkMeterProvider::builder().with_reader(exporter).build(),
                Err(err) => {
                    log::warn!("failed to build prometheus exporter, metrics will not be exported: {err}");
                    SdkMeterProvider::builder().build()
                }
            };
            let meter = provider.meter("lifeguard_hydrator");

            let queries_total = meter
                .u64_counter("lifeguard_hydrator_queries_total")
                .with_description("Total queries executed")
                .build();

            let query_errors_total = meter
                .u64_counter("lifeguard_hydrator_query_errors_total")
                .with_description("Queries rejected by the database")
                .build();

            let query_duration = meter
                .f64_histogram("lifeguard_hydrator_query_duration_seconds")
                .with_description("Duration of queries")
                .build();

            let connection_wait_duration = meter
                .f64_histogram("lifeguard_hydrator_connection_wait_seconds")
                .with_description("Time spent establishing connections")
                .build();

            let hydrated_rows_total = meter
                .u64_counter("lifeguard_hydrator_hydrated_rows_total")
                .with_description("Rows hydrated into objects")
                .build();

            let hydration_duration = meter
                .f64_histogram("lifeguard_hydrator_hydration_duration_seconds")
                .with_description("Time spent fetching and hydrating a result set")
                .build();

            Self {
                registry,
                _provider: provider,
                queries_total,
                query_errors_total,
                query_duration,
                connection_wait_duration,
                hydrated_rows_total,
                hydration_duration,
            }
        }

        pub fn record_query(&self, elapsed: Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }

        pub fn record_connection_wait(&self, elapsed: Duration) {
            self.connection_wait_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_hydration(&self, rows: usize, elapsed: Duration) {
            self.hydrated_rows_total.add(rows as u64, &[]);
            self.hydration_duration.record(elapsed.as_secs_f64(), &[]);
        }

        /// Prometheus text exposition of every instrument
        ///
        /// # Errors
        ///
        /// Returns the encoder's error if the gathered families cannot be encoded.
        pub fn render(&self) -> Result<String, prometheus::Error> {
            TextEncoder::new().encode_to_string(&self.registry.gather())
        }
    }

}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    const MAX_STATEMENT_LEN: usize = 256;

    pub fn execute_query_span(sql: &str) -> Span {
        tracing::info_span!(
            "lifeguard_hydrator.execute_query",
            db.system = "postgresql",
            db.statement = %truncate(sql)
        )
    }

    pub fn acquire_connection_span() -> Span {
        tracing::info_span!("lifeguard_hydrator.acquire_connection", db.system = "postgresql")
    }

    pub fn initialize_span() -> Span {
        tracing::debug_span!("lifeguard_hydrator.result_set.initialize")
    }

    pub fn to_map_span(strategy: &str) -> Span {
        tracing::debug_span!("lifeguard_hydrator.result_set.to_map", key = %strategy)
    }

    fn truncate(sql: &str) -> &str {
        match sql.char_indices().nth(MAX_STATEMENT_LEN) {
            Some((end, _)) => &sql[..end],
            None => sql,
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_statement_is_truncated_on_char_boundary() {
            let sql = "é".repeat(MAX_STATEMENT_LEN + 10);
            assert_eq!(truncate(&sql).chars().count(), MAX_STATEMENT_LEN);
            assert_eq!(truncate("SELECT 1"), "SELECT 1");
        }
    }
}
