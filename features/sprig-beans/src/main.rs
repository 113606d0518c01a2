use std::sync::Arc;

use sprig_beans::{
    Bean, BeanDefinition, BeanError, BeanFactoryBuilder, Component, DestructionAware, DynError,
    Field, Inject, InitializingBean,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), BeanError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let factory = BeanFactoryBuilder::new()
        .property("greeter", serde_json::json!({ "prefix": "Hello" }))
        .definition(
            "english",
            BeanDefinition::builder::<English>()
                .implements::<dyn Greeter>(|english| english as Arc<dyn Greeter>)
                .build()?,
        )
        .component::<Welcome>()
        .build()?;

    println!("{:?}", factory);
    let welcome = factory.get_bean_as::<Welcome>("Welcome")?;
    println!("{}", welcome.greeter.greet("world"));

    factory.destroy();
    Ok(())
}

trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

#[derive(Default)]
struct English {
    prefix: Inject<String>,
}
impl Greeter for English {
    fn greet(&self, name: &str) -> String {
        format!("{} {name}!", *self.prefix)
    }
}
impl Bean for English {}
impl Component for English {
    fn fields() -> Vec<Field<Self>> {
        vec![Field::property("prefix", "value:${greeter.prefix:=Hi}", |e| &e.prefix)]
    }
}

#[derive(Default)]
struct Welcome {
    greeter: Inject<Arc<dyn Greeter>>,
}
impl InitializingBean for Welcome {
    fn after_properties_set(&self) -> Result<(), DynError> {
        tracing::info!("welcome is ready");
        Ok(())
    }
}
impl DestructionAware for Welcome {
    fn before_destruction(&self, name: &str) {
        tracing::info!(bean = name, "welcome is going away");
    }
}
impl Bean for Welcome {
    fn as_initializing(&self) -> Option<&dyn InitializingBean> {
        Some(self)
    }

    fn as_destruction_aware(&self) -> Option<&dyn DestructionAware> {
        Some(self)
    }
}
impl Component for Welcome {
    fn fields() -> Vec<Field<Self>> {
        vec![Field::bean("greeter", "autowire:?", |w| &w.greeter)]
    }
}
