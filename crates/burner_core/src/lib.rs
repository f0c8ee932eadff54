pub mod domain;
pub mod editor;
pub mod ports;
pub mod routes;
pub mod session;
pub mod srt;
pub mod timeline;
pub mod upload;
pub mod view;

pub use domain::{
    CaptionStyle, CreateProjectRequest, Cue, CueError, FileDescriptor, PlaybackClock, Project,
    ProjectStatus, SessionUser, UploadRequest, UploadTicket, UploadedFile, User,
    UserCredentials, Video,
};
pub use ports::{
    AuthApi, DatabaseService, ObjectStorage, ObjectTransfer, PortError, PortResult,
    ProgressObserver, SessionPersistence, UploadApi,
};
