use anyhow::Context;
use clap::{Parser, Subcommand};
use entity_store::specification::AnyEntity;
use entity_store::{FileEntityStore, StoreConfig, StoredEntity};
use entity_store_macros::entity;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use ulid::Ulid;

#[entity(type_name = "Invoice")]
struct Invoice {
    customer: String,
    amount: i64,
}

#[entity(type_name = "Customer", backup = false)]
struct Customer {
    name: String,
}

#[derive(Debug, Parser)]
#[command(name = "demo", about = "File entity store playground")]
struct Cli {
    /// 存储根目录
    #[arg(long, default_value = "data")]
    dir: PathBuf,

    /// 备份根目录
    #[arg(long, default_value = "backup")]
    backup_dir: PathBuf,

    /// 期望的数据格式版本；0 表示不校验
    #[arg(long, default_value_t = 1)]
    version: i64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 新建发票，客户不存在时先登记
    Add { customer: String, amount: i64 },
    /// 修改发票金额
    Amend { id: String, amount: i64 },
    /// 删除发票
    Remove { id: String },
    /// 打印存储中的全部实体
    List {
        /// 只列出金额不低于该值的发票
        #[arg(long)]
        min_amount: Option<i64>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = StoreConfig::builder()
        .dir(cli.dir)
        .backup_dir(cli.backup_dir)
        .version(cli.version)
        .build();
    let store = FileEntityStore::open(config);
    store.load::<Customer>("customers")?;
    store.load::<Invoice>("invoices")?;

    match cli.command {
        // 开票
        Command::Add { customer, amount } => {
            let customer_id = match store
                .all::<Customer>()?
                .into_iter()
                .find(|c| c.name == customer)
            {
                Some(existing) => existing.id.clone(),
                None => {
                    let created = store.save(Customer {
                        id: Ulid::new().to_string(),
                        name: customer,
                    })?;
                    tracing::info!(id = %created.id, "registered customer");
                    created.id.clone()
                }
            };
            let invoice = store.save(Invoice {
                id: Ulid::new().to_string(),
                customer: customer_id,
                amount,
            })?;
            println!("{}", invoice.id);
        }
        // 改价
        Command::Amend { id, amount } => {
            let current = store
                .get::<Invoice>(&id)
                .with_context(|| format!("no invoice with id {id}"))?;
            store.save(Invoice {
                amount,
                ..(*current).clone()
            })?;
        }
        Command::Remove { id } => {
            let current = store
                .get::<Invoice>(&id)
                .with_context(|| format!("no invoice with id {id}"))?;
            store.delete(current.as_ref())?;
        }
        Command::List { min_amount } => {
            let entities = match min_amount {
                Some(min) => {
                    let at_least = move |e: &dyn StoredEntity| {
                        e.downcast_ref::<Invoice>().is_some_and(|i| i.amount >= min)
                    };
                    store.get_entities(None, &at_least)
                }
                None => store.get_entities(None, &AnyEntity),
            };
            for entity in &entities {
                println!("{:<10} {:<28} {:?}", entity.entity_type(), entity.entity_id(), entity);
            }
            println!(
                "{} of {} entities",
                entities.len(),
                store.get_entities_count(None, &AnyEntity)
            );
        }
    }

    Ok(())
}
