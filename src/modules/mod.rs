pub mod auth;
pub mod customers;
pub mod genres;
pub mod movies;
pub mod rentals;
pub mod returns;
pub mod users;

use vidly_kernel::ModuleRegistry;

use crate::context::AppContext;

/// Register every application module with the registry
pub fn register_all(registry: &mut ModuleRegistry, ctx: &AppContext) -> anyhow::Result<()> {
    registry.register(customers::create_module(ctx.clone()))?;
    registry.register(genres::create_module(ctx.clone()))?;
    registry.register(movies::create_module(ctx.clone()))?;
    registry.register(users::create_module(ctx.clone()))?;
    registry.register(auth::create_module(ctx.clone()))?;
    registry.register(rentals::create_module(ctx.clone()))?;
    registry.register(returns::create_module(ctx.clone()))?;
    Ok(())
}
