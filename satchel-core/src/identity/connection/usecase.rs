use rst_common::standard::async_trait::async_trait;
use rst_common::standard::uuid::Uuid;
use rst_common::with_logging::log::{debug, info};

use crate::messaging::envelope::Codec;
use crate::messaging::message::{
    ConnectionAcknowledgeMessage, ConnectionRequestMessage, ConnectionResponseMessage,
    ContentMessage, InvitationMessage,
};
use crate::messaging::types::RouterBuilder;
use crate::runtime::types::CryptoRuntimeBuilder;

use super::types::{
    ConnectionAPI, ConnectionAlias, ConnectionEntityAccessor, ConnectionError,
    InviteConfiguration, RepoBuilder, State, UsecaseBuilder,
};
use super::Connection;

#[derive(Clone)]
pub struct Usecase<TRepo, TCrypto, TRouter>
where
    TRepo: RepoBuilder<EntityAccessor = Connection>,
    TCrypto: CryptoRuntimeBuilder,
    TRouter: RouterBuilder,
{
    repo: TRepo,
    crypto: TCrypto,
    router: TRouter,
    endpoint: String,
    owner: Option<ConnectionAlias>,
}

impl<TRepo, TCrypto, TRouter> Usecase<TRepo, TCrypto, TRouter>
where
    TRepo: RepoBuilder<EntityAccessor = Connection>,
    TCrypto: CryptoRuntimeBuilder,
    TRouter: RouterBuilder,
{
    /// `endpoint` is this agent's own inbox uri, it is advertised to every peer
    pub fn new(
        repo: TRepo,
        crypto: TCrypto,
        router: TRouter,
        endpoint: String,
        owner: Option<ConnectionAlias>,
    ) -> Self {
        Self {
            repo,
            crypto,
            router,
            endpoint,
            owner,
        }
    }

    async fn send(
        &self,
        crypto: TCrypto,
        connection: &Connection,
        message: ContentMessage,
    ) -> Result<(), ConnectionError> {
        let (my_key, their_key, endpoint) = connection.outbound()?;
        let envelope = Codec::new(crypto)
            .pack(message, their_key, Some(my_key))
            .await?;

        self.router().forward(envelope, endpoint).await?;
        Ok(())
    }

    async fn ensure_unused(&self, repo: &TRepo, connection_id: String) -> Result<(), ConnectionError> {
        match repo.get_by_connection_id(connection_id.clone()).await {
            Ok(_) => Err(ConnectionError::ProtocolStateError(format!(
                "connection id already in use: {}",
                connection_id
            ))),
            Err(ConnectionError::NotFoundError(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

impl<TRepo, TCrypto, TRouter> UsecaseBuilder<Connection> for Usecase<TRepo, TCrypto, TRouter>
where
    TRepo: RepoBuilder<EntityAccessor = Connection>,
    TCrypto: CryptoRuntimeBuilder,
    TRouter: RouterBuilder,
{
    type RepoImplementer = TRepo;
    type CryptoImplementer = TCrypto;
    type RouterImplementer = TRouter;

    fn repo(&self) -> Self::RepoImplementer {
        self.repo.clone()
    }

    fn crypto(&self) -> Self::CryptoImplementer {
        self.crypto.clone()
    }

    fn router(&self) -> Self::RouterImplementer {
        self.router.clone()
    }
}

#[async_trait]
impl<TRepo, TCrypto, TRouter> ConnectionAPI for Usecase<TRepo, TCrypto, TRouter>
where
    TRepo: RepoBuilder<EntityAccessor = Connection>,
    TCrypto: CryptoRuntimeBuilder,
    TRouter: RouterBuilder,
{
    type EntityAccessor = Connection;

    async fn create_invitation(
        &self,
        config: InviteConfiguration,
    ) -> Result<(Connection, InvitationMessage), ConnectionError> {
        let connection_id = config
            .connection_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let repo = self.repo();
        self.ensure_unused(&repo, connection_id.clone()).await?;

        let my_key = self
            .crypto()
            .create_key()
            .await
            .map_err(|err| ConnectionError::CryptoRuntimeError(err.to_string()))?;

        let my_alias = config.my_alias.or(self.owner.clone());
        let mut connection = Connection::new(connection_id.clone(), my_key.clone(), State::Invited);
        connection
            .set_my_alias(my_alias.clone())
            .set_their_alias(config.their_alias);

        repo.save(&connection).await?;

        info!(
            "[connection:create_invitation] invitation created: {}",
            connection.get_id()
        );

        let invitation = InvitationMessage {
            endpoint: self.endpoint.to_owned(),
            connection_key: my_key,
            connection_id,
            label: my_alias.as_ref().map(|alias| alias.name.to_owned()),
            image_url: my_alias.and_then(|alias| alias.image_url),
        };

        Ok((connection, invitation))
    }

    async fn accept_invitation(
        &self,
        invitation: InvitationMessage,
    ) -> Result<Connection, ConnectionError> {
        if invitation.connection_id.trim().is_empty() {
            return Err(ConnectionError::ValidationError(
                "invitation connection_id was missing".to_string(),
            ));
        }

        if invitation.connection_key.trim().is_empty() {
            return Err(ConnectionError::ValidationError(
                "invitation connection_key was missing".to_string(),
            ));
        }

        if invitation.endpoint.trim().is_empty() {
            return Err(ConnectionError::ValidationError(
                "invitation endpoint was missing".to_string(),
            ));
        }

        let repo = self.repo();
        self.ensure_unused(&repo, invitation.connection_id.clone())
            .await?;

        let crypto = self.crypto();
        let my_key = crypto
            .create_key()
            .await
            .map_err(|err| ConnectionError::CryptoRuntimeError(err.to_string()))?;

        let their_alias = invitation
            .label
            .clone()
            .map(|name| ConnectionAlias::new(name, invitation.image_url.clone()));

        let mut connection = Connection::new(
            invitation.connection_id.clone(),
            my_key.clone(),
            State::Negotiating,
        );

        connection
            .set_peer(invitation.connection_key, invitation.endpoint)
            .set_my_alias(self.owner.clone())
            .set_their_alias(their_alias);

        let request = ConnectionRequestMessage {
            connection_id: invitation.connection_id,
            key: my_key,
            endpoint: self.endpoint.to_owned(),
            label: self.owner.as_ref().map(|owner| owner.name.to_owned()),
            image_url: self.owner.as_ref().and_then(|owner| owner.image_url.clone()),
        };

        self.send(crypto, &connection, ContentMessage::ConnectionRequest(request))
            .await?;
        repo.save(&connection).await?;

        info!(
            "[connection:accept_invitation] connection request sent: {}",
            connection.get_id()
        );

        Ok(connection)
    }

    async fn process_request(
        &self,
        request: ConnectionRequestMessage,
    ) -> Result<Connection, ConnectionError> {
        let repo = self.repo();
        let mut connection = repo
            .get_by_connection_id(request.connection_id.clone())
            .await?;

        match connection.get_state() {
            State::Invited => {}
            _ if connection.get_their_key() == Some(request.key.clone()) => {
                debug!(
                    "[connection:process_request] request already processed: {}",
                    connection.get_id()
                );
                return Ok(connection);
            }
            state => {
                return Err(ConnectionError::ProtocolStateError(format!(
                    "unexpected connection request, current state: {}",
                    state.as_str()
                )))
            }
        }

        if request.key.trim().is_empty() || request.endpoint.trim().is_empty() {
            return Err(ConnectionError::ValidationError(
                "connection request key or endpoint was missing".to_string(),
            ));
        }

        let their_alias = request
            .label
            .clone()
            .map(|name| ConnectionAlias::new(name, request.image_url.clone()));

        connection
            .set_peer(request.key, request.endpoint)
            .set_their_alias(their_alias);
        connection.transition(State::Negotiating)?;

        let response = ConnectionResponseMessage {
            connection_id: connection.get_connection_id(),
            key: connection.get_my_key(),
            endpoint: self.endpoint.to_owned(),
        };

        self.send(
            self.crypto(),
            &connection,
            ContentMessage::ConnectionResponse(response),
        )
        .await?;
        repo.save(&connection).await?;

        info!(
            "[connection:process_request] connection response sent: {}",
            connection.get_id()
        );

        Ok(connection)
    }

    async fn process_response(
        &self,
        response: ConnectionResponseMessage,
    ) -> Result<Connection, ConnectionError> {
        let repo = self.repo();
        let mut connection = repo
            .get_by_connection_id(response.connection_id.clone())
            .await?;

        if connection.is_connected() {
            debug!(
                "[connection:process_response] already connected: {}",
                connection.get_id()
            );
            return Ok(connection);
        }

        if connection.get_state() != State::Negotiating
            || connection.get_their_key() != Some(response.key.clone())
        {
            return Err(ConnectionError::ProtocolStateError(format!(
                "unexpected connection response, current state: {}",
                connection.get_state().as_str()
            )));
        }

        if !response.endpoint.trim().is_empty() {
            connection.set_peer(response.key, response.endpoint);
        }
        connection.transition(State::Connected)?;

        let ack = ConnectionAcknowledgeMessage {
            connection_id: connection.get_connection_id(),
        };

        self.send(
            self.crypto(),
            &connection,
            ContentMessage::ConnectionAcknowledge(ack),
        )
        .await?;
        repo.save(&connection).await?;

        info!(
            "[connection:process_response] connection established: {}",
            connection.get_id()
        );

        Ok(connection)
    }

    async fn process_acknowledgement(
        &self,
        ack: ConnectionAcknowledgeMessage,
    ) -> Result<Connection, ConnectionError> {
        let repo = self.repo();
        let mut connection = repo.get_by_connection_id(ack.connection_id).await?;

        match connection.get_state() {
            State::Connected => return Ok(connection),
            State::Negotiating => connection.transition(State::Connected)?,
            State::Invited => {
                return Err(ConnectionError::ProtocolStateError(
                    "unexpected acknowledgement for a pending invitation".to_string(),
                ))
            }
        }

        repo.save(&connection).await?;

        info!(
            "[connection:process_acknowledgement] connection established: {}",
            connection.get_id()
        );

        Ok(connection)
    }

    async fn get_connection(&self, id: String) -> Result<Connection, ConnectionError> {
        self.repo().get_by_id(id).await
    }

    async fn get_by_connection_id(
        &self,
        connection_id: String,
    ) -> Result<Connection, ConnectionError> {
        self.repo().get_by_connection_id(connection_id).await
    }

    async fn list_connections(
        &self,
        state: Option<State>,
    ) -> Result<Vec<Connection>, ConnectionError> {
        self.repo().list_by_state(state).await
    }
}
