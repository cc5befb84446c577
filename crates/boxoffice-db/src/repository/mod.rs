//! # Repository Module
//!
//! Database repository implementations for Box Office.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who Owns Which Rows                                  │
//! │                                                                         │
//! │  Inventory Store                         Waitlist Queue                 │
//! │  ├── EventRepository   events           └── WaitlistRepository         │
//! │  ├── TicketRepository  tickets               waitlist                  │
//! │  └── UserRepository    users                                           │
//! │                                                                         │
//! │  Two kinds of methods:                                                 │
//! │  • `fn x(&self, ...)`                    - own connection from the pool│
//! │  • `fn x(&self, conn: &mut SqliteConnection, ...)`                     │
//! │                                          - caller's transaction        │
//! │                                                                         │
//! │  Every mutation that must commit together with another one takes a     │
//! │  connection, so the engine decides the transaction boundary.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod event;
pub mod ticket;
pub mod user;
pub mod waitlist;
