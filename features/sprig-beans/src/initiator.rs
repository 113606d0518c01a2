use std::{
    thread::{self, sleep},
    time::Duration,
};

use futures::{
    executor::{block_on, ThreadPool},
    stream::FuturesUnordered,
    task::SpawnExt,
    StreamExt,
};
use futures_channel::oneshot;

use crate::{bean::indirect_to, errors::BeanError, factory::BeanFactory, scope::BeanScope};

/// Eagerly creates the singletons of a factory
pub(crate) struct SingletonInitiator {
    factory: BeanFactory,
}

impl SingletonInitiator {
    pub(crate) fn new(factory: BeanFactory) -> Self {
        SingletonInitiator { factory }
    }

    pub(crate) fn initiate(self, timeout: Option<Duration>) -> Result<(), BeanError> {
        let names = self.pending_singletons();
        tracing::debug!("Pre-instantiating {} singleton definitions", names.len());

        if !names.is_empty() {
            self.instantiate(names, timeout)?;
        }

        self.notify_smart_singletons()
    }

    /// Names of the non-lazy singleton definitions
    fn pending_singletons(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.factory
            .registry()
            .visit_bean_definitions(&mut |name, definition| {
                if definition.scope() == BeanScope::Singleton && !definition.is_lazy() {
                    names.push(name.to_string());
                }
            });
        names
    }

    /// Creates all beans on a thread pool, the first failure cancels what did not start
    fn instantiate(&self, names: Vec<String>, timeout: Option<Duration>) -> Result<(), BeanError> {
        // If we have a timeout - spawn a thread to signal once it's done
        let (timeout_tx, mut timeout_rx) = oneshot::channel::<()>();
        if let Some(timeout) = timeout {
            // Not joined, the thread dies after the timeout
            thread::spawn(move || {
                sleep(timeout);
                let _ = timeout_tx.send(());
            });
        }

        let concurrency = self
            .factory
            .0
            .concurrency
            .unwrap_or_else(num_cpus::get)
            .max(1);
        let pool = ThreadPool::builder()
            .pool_size(concurrency.min(names.len()))
            .name_prefix("sprig-init-")
            .create()
            .map_err(|error| {
                BeanError::Invalid(format!("cannot create the initiation thread pool: {error}"))
            })?;

        let mut pending = FuturesUnordered::new();
        for name in names {
            let factory = self.factory.clone();
            let handle = pool
                .spawn_with_handle(async move {
                    let result = factory.get_bean(&name).map(|_| ());
                    (name, result)
                })
                .map_err(|error| {
                    BeanError::Invalid(format!("cannot schedule singleton creation: {error}"))
                })?;
            pending.push(handle);
        }

        let total = pending.len();
        block_on(async {
            loop {
                tracing::debug!(
                    "Waiting for singletons to finish [{} of {total} complete]",
                    total - pending.len()
                );

                futures::select! {
                    result = pending.next() => match result {
                        Some((name, Ok(()))) => {
                            tracing::info!(bean = %name, "instantiate singleton bean");
                        }
                        Some((name, Err(error))) => {
                            tracing::error!(bean = %name, %error, "instantiate singleton bean failed");
                            return Err(error);
                        }
                        None => return Ok(()),
                    },
                    _ = timeout_rx => {
                        return Err(BeanError::Timeout)
                    }
                }
            }
        })
    }

    fn notify_smart_singletons(&self) -> Result<(), BeanError> {
        for (name, bean) in self.factory.singletons() {
            let notified = indirect_to(&*bean, |b| {
                b.as_smart_singleton()
                    .map(|smart| smart.after_singletons_instantiated())
            });

            match notified {
                Some(Ok(())) => {
                    tracing::debug!(bean = %name, "singleton bean implements SmartInitializingSingleton, executed it");
                }
                Some(Err(error)) => {
                    let error = BeanError::lifecycle(&name, "after_singletons_instantiated", error);
                    tracing::error!(bean = %name, %error, "Smart instantiate singleton bean failed");
                    return Err(error);
                }
                None => {
                    tracing::debug!(bean = %name, "singleton bean doesn't implement SmartInitializingSingleton, skip it");
                }
            }
        }
        Ok(())
    }
}
