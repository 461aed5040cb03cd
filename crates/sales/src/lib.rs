//! Sales-side demand that waits on purchasing.
//!
//! A backorder request records sales order quantity that could not be served
//! from stock. Receipts on linked purchase order lines draw it down.

pub mod backorder;

pub use backorder::{
    BackorderRequest, BackorderRequestId, BackorderStatus, ReceiptEffect, SalesOrderId,
    SalesOrderLineId,
};
