//! Delete command implementation.

use anyhow::{Context, Result};
use clap::Args;
use parsekit::{Object, ObjectBase, ParseApi};

use crate::cli::ConnectionArgs;
use crate::connection;
use crate::output;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Class of the object
    pub class: String,

    /// Object id
    pub object_id: String,

    /// Send the master key
    #[arg(long)]
    pub master: bool,
}

pub async fn run(args: DeleteArgs, connection: ConnectionArgs) -> Result<()> {
    let api = connection::connect(&connection)?;

    let mut object = Object::new(super::class_name(&args.class)?);
    object.base = ObjectBase::with_id(&args.object_id);

    api.delete(&object, args.master)
        .await
        .with_context(|| format!("Failed to delete {}/{}", args.class, args.object_id))?;

    output::success(&format!("Deleted {}/{}", args.class, args.object_id));
    Ok(())
}
