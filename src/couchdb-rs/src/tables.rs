//! Status messages reported by each endpoint.

use couchdb_core::StatusTable;

pub const GET_INFO: StatusTable = StatusTable::new(&[(200, "OK - Request completed successfully")]);

pub const GET_UUIDS: StatusTable = StatusTable::new(&[
    (200, "OK - Request completed successfully"),
    (403, "Forbidden – Requested more UUIDs than is allowed to retrieve"),
]);

pub const LIST_DATABASES: StatusTable =
    StatusTable::new(&[(200, "OK - Request completed successfully")]);

pub const CREATE_DATABASE: StatusTable = StatusTable::new(&[
    (201, "Created - Database created successfully"),
    (202, "Accepted - Database created, but not yet stored on disk"),
    (400, "Bad Request - Invalid database name"),
    (401, "Unauthorized - CouchDB Server Administrator privileges required"),
    (412, "Precondition Failed - Database already exists"),
]);

pub const GET_DATABASE: StatusTable = StatusTable::new(&[
    (200, "OK - Request completed successfully"),
    (404, "Not Found – Requested database not found"),
]);

pub const DELETE_DATABASE: StatusTable = StatusTable::new(&[
    (200, "OK - Database removed successfully"),
    (202, "Accepted - Database removal accepted, but not yet applied on disk"),
    (400, "Bad Request - Invalid database name or forgotten document id by accident"),
    (401, "Unauthorized - CouchDB Server Administrator privileges required"),
    (404, "Not Found - Database doesn’t exist"),
]);

pub const GET_ALL_DOCUMENTS: StatusTable =
    StatusTable::new(&[(200, "OK - Request completed successfully")]);

pub const GET_DOCUMENT: StatusTable = StatusTable::new(&[
    (200, "OK - Request completed successfully"),
    (304, "Not Modified - Document wasn’t modified since specified revision"),
    (400, "Bad Request - The format of the request or revision was invalid"),
    (401, "Unauthorized - Read privilege required"),
    (404, "Not Found - Document not found"),
]);

pub const CREATE_DOCUMENT: StatusTable = StatusTable::new(&[
    (201, "Created – Document created and stored on disk"),
    (202, "Accepted – Document data accepted, but not yet stored on disk"),
    (400, "Bad Request – Invalid request body or parameters"),
    (401, "Unauthorized – Write privileges required"),
    (404, "Not Found – Specified database or document ID doesn’t exists"),
    (409, "Conflict – Document with the specified ID already exists or specified revision is not latest for target document"),
]);

pub const DELETE_DOCUMENT: StatusTable = StatusTable::new(&[
    (200, "OK - Document successfully removed"),
    (202, "Accepted - Request was accepted, but changes are not yet stored on disk"),
    (400, "Bad Request - Invalid request body or parameters"),
    (401, "Unauthorized - Write privilege required"),
    (404, "Not Found - Specified database or document ID doesn't exist"),
    (409, "Conflict - Specified revision is not the latest for target document"),
]);

pub const CREATE_BULK_DOCUMENTS: StatusTable = StatusTable::new(&[
    (201, "Created – Document(s) have been created or updated"),
    (400, "Bad Request – The request provided invalid JSON data"),
    (417, "Expectation Failed – Occurs when all_or_nothing option set as true and at least one document was rejected by validation function"),
    (500, "Internal Server Error – Malformed data provided, while it’s still valid JSON"),
]);

pub const FIND_DOCUMENTS: StatusTable = StatusTable::new(&[
    (200, "OK - Request completed successfully"),
    (400, "Bad Request - Invalid request"),
    (401, "Unauthorized - Read permission required"),
    (500, "Internal Server Error - Query execution error"),
]);

pub const CREATE_INDEX: StatusTable = StatusTable::new(&[
    (200, "OK - Index created successfully or already exists"),
    (400, "Bad Request - Invalid request"),
    (401, "Unauthorized - Admin permission required"),
    (500, "Internal Server Error - Execution error"),
]);

pub const GET_INDEX: StatusTable = StatusTable::new(&[(200, "OK - Success")]);

pub const DELETE_INDEX: StatusTable = StatusTable::new(&[
    (200, "OK - Success"),
    (400, "Bad Request - Invalid request"),
    (401, "Unauthorized - Writer permission required"),
    (404, "Not Found - Index not found"),
]);

pub const GET_DESIGN_DOCUMENT: StatusTable = StatusTable::new(&[
    (200, "OK - Request completed successfully"),
    (304, "Not Modified - Document wasn’t modified since specified revision"),
    (400, "Bad Request - The format of the request or revision was invalid"),
    (401, "Unauthorized - Read privilege required"),
    (404, "Not Found - Document not found"),
]);

pub const GET_DESIGN_DOCUMENT_INFO: StatusTable =
    StatusTable::new(&[(200, "OK - Request completed successfully")]);

pub const CREATE_DESIGN_DOCUMENT: StatusTable = StatusTable::new(&[
    (201, "Created – Document created and stored on disk"),
    (202, "Accepted – Document data accepted, but not yet stored on disk"),
    (400, "Bad Request – Invalid request body or parameters"),
    (401, "Unauthorized – Write privileges required"),
    (404, "Not Found – Specified database or document ID doesn’t exists"),
    (409, "Conflict – Document with the specified ID already exists or specified revision is not latest for target document"),
]);

pub const DELETE_DESIGN_DOCUMENT: StatusTable = StatusTable::new(&[
    (200, "OK - Document successfully removed"),
    (202, "Accepted - Request was accepted, but changes are not yet stored on disk"),
    (400, "Bad Request - Invalid request body or parameters"),
    (401, "Unauthorized - Write privilege required"),
    (404, "Not Found - Specified database or document ID doesn't exist"),
    (409, "Conflict - Specified revision is not the latest for target document"),
]);

pub const GET_VIEW: StatusTable = StatusTable::new(&[
    (200, "OK - Request completed successfully"),
    (400, "Bad Request - Invalid request"),
    (401, "Unauthorized - Read permission required"),
    (404, "Not Found - Specified database, design document or view is missed"),
]);

pub const EXECUTE_UPDATE_FUNCTION: StatusTable = StatusTable::new(&[
    (200, "OK - Request completed successfully"),
    (201, "Created - Document was created or updated"),
    (202, "Accepted - Document was accepted, but not yet stored on disk"),
    (400, "Bad Request - Invalid request"),
    (401, "Unauthorized - Write permission required"),
    (404, "Not Found - Specified database, design document or update function is missed"),
]);

pub const ADD_ATTACHMENT: StatusTable = StatusTable::new(&[
    (201, "Created - Attachment created and stored on disk"),
    (202, "Accepted - Request was accepted, but changes are not yet stored on disk"),
    (400, "Bad Request - Invalid request body or parameters"),
    (401, "Unauthorized - Write privileges required"),
    (404, "Not Found - Specified database, document or attachment was not found"),
    (409, "Conflict - Document’s revision wasn’t specified or it’s not the latest"),
]);

pub const GET_ATTACHMENT: StatusTable = StatusTable::new(&[
    (200, "OK - Attachment exists"),
    (304, "Not Modified - Attachment wasn’t modified if ETag equals specified If-None-Match header"),
    (401, "Unauthorized - Read privilege required"),
    (404, "Not Found - Specified database, document or attchment was not found"),
]);

pub const DELETE_ATTACHMENT: StatusTable = StatusTable::new(&[
    (200, "OK - Attachment successfully removed"),
    (202, "Accepted - Request was accepted, but changes are not yet stored on disk"),
    (400, "Bad Request - Invalid request body or parameters"),
    (401, "Unauthorized - Write privileges required"),
    (404, "Not Found - Specified database, document or attachment was not found"),
    (409, "Conflict - Document’s revision wasn’t specified or it’s not the latest"),
]);
