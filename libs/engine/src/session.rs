use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use itertools::Itertools;
use parking_lot::RwLock;
use yql_dataset::Row;

use crate::{DataFrame, ProviderRegistry, SessionConfig, SessionConfigRef, TableProviderFactory};

/// Entry point of the engine: owns configuration and the named providers.
pub struct Session {
    config: SessionConfigRef,
    registry: RwLock<ProviderRegistry>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry: Default::default(),
        }
    }

    #[inline]
    pub fn config(&self) -> &SessionConfigRef {
        &self.config
    }

    #[inline]
    pub fn default_parallelism(&self) -> usize {
        self.config.default_parallelism
    }

    /// Returns `false` if a provider with the same name is already registered.
    pub fn register_provider(&self, factory: impl TableProviderFactory) -> bool {
        self.registry.write().register(Arc::new(factory))
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.registry.read().contains(name)
    }

    pub fn read(&self) -> DataFrameReader<'_> {
        DataFrameReader {
            session: self,
            format: None,
            options: HashMap::new(),
        }
    }
}

/// Builds a [`DataFrame`] from a registered provider.
pub struct DataFrameReader<'a> {
    session: &'a Session,
    format: Option<String>,
    options: HashMap<String, String>,
}

impl<'a> DataFrameReader<'a> {
    pub fn format(self, name: impl Into<String>) -> Self {
        Self {
            format: Some(name.into()),
            ..self
        }
    }

    pub fn options<K, V>(mut self, options: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.options.extend(
            options
                .into_iter()
                .map(|(key, value)| (key.into(), value.into())),
        );
        self
    }

    pub fn load(self) -> Result<DataFrame<Row>> {
        let format = match self.format {
            Some(format) => format,
            None => anyhow::bail!("no format specified"),
        };

        let factory = {
            let registry = self.session.registry.read();
            match registry.get(&format) {
                Some(factory) => factory,
                None => anyhow::bail!(
                    "unknown provider '{}', registered providers: [{}]",
                    format,
                    registry.names().iter().join(", ")
                ),
            }
        };

        let provider = factory.create(&self.options)?;
        Ok(DataFrame::new(self.session.config.clone(), provider))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::TryStreamExt;
    use yql_dataset::{DataType, Field, Schema, SchemaRef, Value};

    use super::*;
    use crate::{BoxRowReader, InputPartition, RowReader, TableProvider, TableProviderRef};

    struct Counters {
        created: AtomicUsize,
        closed: AtomicUsize,
        running: AtomicUsize,
        max_running: AtomicUsize,
    }

    impl Counters {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                created: AtomicUsize::new(0),
                closed: AtomicUsize::new(0),
                running: AtomicUsize::new(0),
                max_running: AtomicUsize::new(0),
            })
        }
    }

    /// Serves `partitions` of integers; the first `failures` readers fail on their first row.
    struct VecProvider {
        partitions: Vec<Vec<i64>>,
        failures: usize,
        retry: bool,
        counters: Arc<Counters>,
    }

    struct VecReader {
        rows: std::vec::IntoIter<i64>,
        fail: bool,
        counters: Arc<Counters>,
    }

    impl RowReader for VecReader {
        fn next(&mut self) -> Result<Option<Row>> {
            anyhow::ensure!(!self.fail, "disk on fire");
            std::thread::sleep(std::time::Duration::from_millis(5));
            Ok(self
                .rows
                .next()
                .map(|n| Row::new(vec![Value::Int64(n)])))
        }

        fn close(&mut self) -> Result<()> {
            self.counters.running.fetch_sub(1, Ordering::SeqCst);
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl TableProvider for VecProvider {
        fn schema(&self) -> SchemaRef {
            Arc::new(Schema::try_new(vec![Field::new("n", DataType::Int64)]).unwrap())
        }

        fn plan_partitions(&self) -> Result<Vec<InputPartition>> {
            Ok((0..self.partitions.len())
                .map(|index| InputPartition {
                    index,
                    payload: Vec::new(),
                    estimated_size_bytes: self.partitions[index].len() as u64 * 8,
                })
                .collect())
        }

        fn create_reader(&self, partition: &InputPartition) -> Result<BoxRowReader> {
            let created = self.counters.created.fetch_add(1, Ordering::SeqCst);
            let running = self.counters.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.max_running.fetch_max(running, Ordering::SeqCst);
            Ok(Box::new(VecReader {
                rows: self.partitions[partition.index].clone().into_iter(),
                fail: created < self.failures,
                counters: self.counters.clone(),
            }))
        }

        fn should_retry(&self, _err: &anyhow::Error) -> bool {
            self.retry
        }
    }

    struct VecFactory {
        partitions: Vec<Vec<i64>>,
        failures: usize,
        counters: Arc<Counters>,
    }

    impl TableProviderFactory for VecFactory {
        fn provider_name(&self) -> &'static str {
            "vec"
        }

        fn create(&self, options: &HashMap<String, String>) -> Result<TableProviderRef> {
            let skip = match options.get("skip") {
                Some(skip) => skip.parse::<usize>()?,
                None => 0,
            };
            let retry = match options.get("retry") {
                Some(retry) => retry.parse::<bool>()?,
                None => true,
            };
            Ok(Arc::new(VecProvider {
                partitions: self.partitions.iter().skip(skip).cloned().collect(),
                failures: self.failures,
                retry,
                counters: self.counters.clone(),
            }))
        }
    }

    fn session(config: SessionConfig, failures: usize) -> (Session, Arc<Counters>) {
        let counters = Counters::new();
        let session = Session::new(config);
        assert!(session.register_provider(VecFactory {
            partitions: vec![vec![1, 2, 3], vec![4, 5], vec![6, 7]],
            failures,
            counters: counters.clone(),
        }));
        (session, counters)
    }

    #[tokio::test]
    async fn test_collect_partitions() {
        let (session, counters) = session(SessionConfig::default(), 0);
        let df = session.read().format("vec").load().unwrap();
        assert_eq!(df.partitions().unwrap().len(), 3);

        let partitions = df
            .map(|row| match row.get(0) {
                Some(Value::Int64(n)) => Ok(*n * 10),
                _ => anyhow::bail!("unexpected row"),
            })
            .collect_partitions()
            .await
            .unwrap();
        assert_eq!(partitions, vec![vec![10, 20, 30], vec![40, 50], vec![60, 70]]);
        assert_eq!(counters.created.load(Ordering::SeqCst), 3);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_options_reach_provider() {
        let (session, _) = session(SessionConfig::default(), 0);
        let df = session
            .read()
            .format("vec")
            .options(vec![("skip", "2")])
            .load()
            .unwrap();
        assert_eq!(df.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_max_concurrent_tasks() {
        let (session, counters) =
            session(SessionConfig::default().with_max_concurrent_tasks(1), 0);
        let df = session.read().format("vec").load().unwrap();
        assert_eq!(df.count().await.unwrap(), 7);
        assert_eq!(counters.max_running.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_task_is_closed_and_surfaces() {
        let (session, counters) = session(SessionConfig::default().with_max_concurrent_tasks(1), 1);
        let df = session.read().format("vec").load().unwrap();
        let err = df.collect().await.unwrap_err();
        assert_eq!(err.to_string(), "partition 0 failed after 1 attempt(s)");
        assert_eq!(err.root_cause().to_string(), "disk on fire");
        assert!(counters.closed.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_failure_aborts_queued_tasks() {
        let (session, counters) = session(SessionConfig::default().with_max_concurrent_tasks(1), 1);
        let df = session.read().format("vec").load().unwrap();
        df.count().await.unwrap_err();

        std::thread::sleep(std::time::Duration::from_millis(100));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(counters.created.load(Ordering::SeqCst) < 3);
    }

    #[tokio::test]
    async fn test_failed_task_is_retried() {
        let (session, counters) = session(
            SessionConfig::default()
                .with_max_concurrent_tasks(1)
                .with_task_max_attempts(2),
            1,
        );
        let df = session.read().format("vec").load().unwrap();
        assert_eq!(df.count().await.unwrap(), 7);
        assert_eq!(counters.created.load(Ordering::SeqCst), 4);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_retried() {
        let (session, counters) = session(
            SessionConfig::default()
                .with_max_concurrent_tasks(1)
                .with_task_max_attempts(3),
            1,
        );
        let df = session
            .read()
            .format("vec")
            .options(vec![("retry", "false")])
            .load()
            .unwrap();
        let err = df.collect().await.unwrap_err();
        assert_eq!(err.to_string(), "partition 0 failed after 1 attempt(s)");
        assert_eq!(err.root_cause().to_string(), "disk on fire");
        assert_eq!(counters.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_into_stream() {
        let (session, _) = session(SessionConfig::default(), 0);
        let stream = session.read().format("vec").load().unwrap().into_stream();
        let rows = stream.try_collect::<Vec<_>>().await.unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[3], Row::new(vec![Value::Int64(4)]));
    }

    #[tokio::test]
    async fn test_collect_dataset() {
        let (session, _) = session(SessionConfig::default(), 0);
        let dataset = session
            .read()
            .format("vec")
            .load()
            .unwrap()
            .collect_dataset()
            .await
            .unwrap();
        assert_eq!(dataset.len(), 7);
        assert!(dataset.to_string().contains('7'));
    }

    #[test]
    fn test_unknown_provider() {
        let (session, _) = session(SessionConfig::default(), 0);
        let err = session.read().format("parquet").load().err().unwrap();
        assert_eq!(
            err.to_string(),
            "unknown provider 'parquet', registered providers: [vec]"
        );
        let err = session.read().load().err().unwrap();
        assert_eq!(err.to_string(), "no format specified");
    }

    #[test]
    fn test_register_twice() {
        let (session, counters) = session(SessionConfig::default(), 0);
        assert!(!session.register_provider(VecFactory {
            partitions: Vec::new(),
            failures: 0,
            counters,
        }));
        assert!(session.has_provider("vec"));
    }
}
