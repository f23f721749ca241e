//! GraphQL documents for the bulk operation lifecycle.
//!
//! The caller's query is passed as a variable rather than spliced into the
//! mutation text, so it needs no escaping.

pub const RUN_QUERY: &str = "\
mutation bulkOperationRunQuery($query: String!) {
  bulkOperationRunQuery(query: $query) {
    bulkOperation { id status }
    userErrors { field message }
  }
}";

pub const CURRENT_OPERATION: &str = "\
query currentBulkOperation {
  currentBulkOperation {
    id
    status
    errorCode
    createdAt
    completedAt
    objectCount
    fileSize
    url
    partialDataUrl
  }
}";

pub const CANCEL: &str = "\
mutation bulkOperationCancel($id: ID!) {
  bulkOperationCancel(id: $id) {
    bulkOperation { id status }
    userErrors { field message }
  }
}";
