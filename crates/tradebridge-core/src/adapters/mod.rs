//! Broker adapters.
//!
//! | Adapter | Market | Transport |
//! |---------|--------|-----------|
//! | [`AlpacaBroker`] | US equities (paper) | REST over [`crate::HttpClient`] |
//! | [`SessionBroker`] | China A-shares and futures | [`SessionGateway`] session API |

pub mod alpaca;
pub mod session;

pub use alpaca::{AlpacaBroker, AlpacaConfig, AlpacaConfigError};
pub use session::{
    ContractSpec, GatewayError, InMemorySessionGateway, OrderTicket, PlacedTicket, SessionBroker,
    SessionGateway, TicketAction, TicketType,
};
